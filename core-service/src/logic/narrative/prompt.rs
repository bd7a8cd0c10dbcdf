//! Prompt builders
//!
//! The system prompt carries a context block built from a
//! `PredictionContext`; each operation adds its own user prompt.

use std::fmt::Write;

use crate::logic::context::{PredictionContext, ScenarioOutcome};
use crate::logic::explain::Effect;

pub const ANALYSIS_MAX_TOKENS: u32 = 1000;
pub const QUESTION_MAX_TOKENS: u32 = 800;
pub const FEATURE_MAX_TOKENS: u32 = 600;
pub const SCENARIO_MAX_TOKENS: u32 = 800;
pub const RECOMMENDATION_MAX_TOKENS: u32 = 800;

/// Percentile distance from the median that counts as notable
const NOTABLE_PERCENTILE_GAP: f64 = 30.0;

/// Metrics listed in the context block when present
const KEY_METRICS: &[&str] = &[
    "credit_utilization",
    "payment_history_pct",
    "credit_age_months",
    "hard_inquiries",
    "total_spending_pct",
    "impulse_spending_score",
    "recurring_payment_ratio",
    "payment_consistency",
];

const ROLE_PROMPT: &str = "\
You are a credit risk analyst helping people understand their credit risk assessment.

Your role is to:
- Interpret predictions from a gradient-boosted tree model
- Explain feature attributions as factors that increase or decrease risk
- Answer questions about specific credit and spending features
- Give specific, actionable advice for improving the profile

Guidelines:
- Be supportive; financial topics can be stressful
- Explain technical terms in plain language
- Reference the applicant's actual numbers
- Prioritise the most impactful factors
- Be honest about risk and constructive about solutions";

fn describe(effect: Effect) -> &'static str {
    match effect {
        Effect::IncreasesRisk => "increases risk",
        Effect::DecreasesRisk => "decreases risk",
        Effect::Neutral => "no effect",
    }
}

/// Role description plus the applicant's context block
pub fn system_prompt(context: &PredictionContext) -> String {
    let mut out = String::from(ROLE_PROMPT);

    let _ = write!(
        out,
        "\n\nCURRENT ANALYSIS CONTEXT:\n\
         Prediction: {}\n\
         Risk Probability: {:.1}%\n\
         Risk Band: {}\n",
        context.prediction.label(),
        context.probability() * 100.0,
        context.band.description(),
    );

    let metrics: Vec<(&str, f64)> = KEY_METRICS
        .iter()
        .filter_map(|name| context.features.get(name).map(|v| (*name, v)))
        .collect();
    if !metrics.is_empty() {
        out.push_str("\nKEY METRICS:\n");
        for (name, value) in metrics {
            let _ = writeln!(out, "- {}: {:.2}", name, value);
        }
    }

    if !context.top_contributions.is_empty() {
        out.push_str("\nTOP FACTORS AFFECTING THIS PREDICTION:\n");
        for (i, c) in context.top_contributions.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} = {:.2} ({}, impact: {:.4})",
                i + 1,
                c.feature,
                c.value,
                describe(c.effect),
                c.importance
            );
        }
    }

    if let Some(population) = &context.population {
        let notable: Vec<_> = population
            .iter()
            .filter(|p| (p.percentile - 50.0).abs() >= NOTABLE_PERCENTILE_GAP)
            .collect();
        if !notable.is_empty() {
            out.push_str("\nCOMPARED TO SIMILAR APPLICANTS:\n");
            for p in notable {
                let _ = writeln!(
                    out,
                    "- {}: {:.2} vs average {:.2} ({:.0}th percentile)",
                    p.feature, p.user_value, p.population_mean, p.percentile
                );
            }
        }
    }

    out
}

pub fn analysis_prompt(context: &PredictionContext) -> String {
    format!(
        "Based on the credit risk assessment, provide a comprehensive analysis that includes:\n\n\
         1. Overall Assessment: explain the {} prediction and {:.1}% risk probability in plain language\n\
         2. Key Factors: explain the top factors that most influenced this prediction\n\
         3. Strengths: which parts of the profile are helping\n\
         4. Areas of Concern: which factors are increasing the risk\n\
         5. Recommendations: 3-5 specific steps to improve the profile\n\n\
         Keep it clear, empathetic and actionable.",
        context.prediction.label(),
        context.probability() * 100.0
    )
}

/// Explanation request for one feature; `None` when the feature is unknown
pub fn feature_prompt(context: &PredictionContext, feature: &str) -> Option<String> {
    let value = context.features.get(feature)?;

    let impact = match context.explanation.contribution(feature) {
        Some(c) if c.effect != Effect::Neutral => {
            format!("{} by {:.4}", describe(c.effect), c.importance)
        }
        Some(_) => "no effect on this prediction".to_string(),
        None => "unknown".to_string(),
    };

    let mut prompt = format!(
        "Explain the credit feature '{}' to the user:\n\n\
         Current Value: {:.2}\n\
         Impact on Risk: {}\n",
        feature, value, impact
    );
    if let Some(stat) = context.importance(feature) {
        let _ = writeln!(prompt, "Model-wide Importance Rank: {}", stat.rank);
    }
    if let Some(p) = context.comparison(feature) {
        let _ = writeln!(
            prompt,
            "Population: average {:.2}, median {:.2}, user at {:.0}th percentile",
            p.population_mean, p.population_median, p.percentile
        );
    }
    prompt.push_str(
        "\nPlease explain:\n\
         1. What this feature means in plain language\n\
         2. How the current value compares to healthy ranges\n\
         3. How it is affecting the credit risk\n\
         4. Specific actions to improve it",
    );
    Some(prompt)
}

pub fn scenario_prompt(context: &PredictionContext, outcome: &ScenarioOutcome) -> String {
    let mut prompt =
        String::from("The user wants to know how their credit risk would change with these changes:\n\n");
    for (feature, new_value) in &outcome.changes {
        match context.features.get(feature) {
            Some(current) => {
                let _ = writeln!(prompt, "- {}: {:.2} -> {:.2}", feature, current, new_value);
            }
            None => {
                let _ = writeln!(prompt, "- {}: -> {:.2}", feature, new_value);
            }
        }
    }

    let _ = write!(
        prompt,
        "\nProjected result: probability {:.1}% -> {:.1}% ({:+.1} points, {:+.1}%), label {} -> {}.\n\n\
         Explain:\n\
         1. How each change drives the projected result\n\
         2. Which change matters most\n\
         3. A realistic timeline for making these changes\n\
         4. Challenges the user might face",
        outcome.original_probability * 100.0,
        outcome.projected_probability * 100.0,
        outcome.absolute_change * 100.0,
        outcome.percent_change,
        outcome.original_label,
        outcome.projected_label,
    );
    prompt
}

pub fn recommendation_prompt(context: &PredictionContext) -> String {
    let factors = context.risk_factors();
    let mut prompt = String::new();

    if factors.is_empty() {
        prompt.push_str(
            "None of the top factors are increasing this applicant's risk. \
             Suggest how to maintain the current profile.\n",
        );
    } else {
        prompt.push_str("These factors are increasing the applicant's risk:\n");
        for c in factors {
            let _ = writeln!(prompt, "- {} = {:.2} (impact: {:.4})", c.feature, c.value, c.importance);
        }
        prompt.push_str(
            "\nGive one concrete, prioritised recommendation per factor, \
             with a target value where it makes sense.\n",
        );
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::logic::config::AnalysisConfig;
    use crate::logic::context::Analyzer;
    use crate::logic::fixtures;

    fn context() -> (Analyzer, PredictionContext) {
        let analyzer = Analyzer::with_model(fixtures::shared_model(), AnalysisConfig::default());
        let context = analyzer.analyze(&fixtures::high_risk_record(), None).unwrap();
        (analyzer, context)
    }

    #[test]
    fn test_system_prompt_context_block() {
        let (_, context) = context();
        let prompt = system_prompt(&context);

        assert!(prompt.contains("Prediction: HIGH RISK"));
        assert!(prompt.contains("Risk Probability: 90.5%"));
        assert!(prompt.contains("1. credit_utilization = 85.50 (increases risk"));
        assert!(prompt.contains("- hard_inquiries: "));
        // No reference dataset attached
        assert!(!prompt.contains("COMPARED TO"));
    }

    #[test]
    fn test_feature_prompt() {
        let (_, context) = context();
        let prompt = feature_prompt(&context, "total_spending_pct").unwrap();
        assert!(prompt.contains("increases risk by 0.5600"));
        assert!(prompt.contains("Model-wide Importance Rank: 1"));

        assert!(feature_prompt(&context, "shoe_size").is_none());
    }

    #[test]
    fn test_scenario_prompt_lists_changes() {
        let (analyzer, context) = context();
        let changes: BTreeMap<String, f64> = [("credit_utilization".to_string(), 20.0)].into();
        let outcome = analyzer.project(&context, &changes).unwrap();

        let prompt = scenario_prompt(&context, &outcome);
        assert!(prompt.contains("- credit_utilization: 85.50 -> 20.00"));
        assert!(prompt.contains("label HIGH RISK -> HIGH RISK"));
    }

    #[test]
    fn test_recommendation_prompt_lists_risk_factors() {
        let (_, context) = context();
        let prompt = recommendation_prompt(&context);
        for factor in context.risk_factors() {
            assert!(prompt.contains(&factor.feature));
        }
    }
}
