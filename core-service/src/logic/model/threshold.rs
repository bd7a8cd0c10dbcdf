//! Risk Threshold Policy
//!
//! Maps ensemble margins to probabilities and the binary risk label.
//! A `RiskPrediction` can only be built from a margin, so its label and
//! probability never disagree.

use serde::{Deserialize, Serialize};

use crate::constants::RISK_THRESHOLD;

/// Logistic link
pub fn sigmoid(margin: f64) -> f64 {
    if margin >= 0.0 {
        1.0 / (1.0 + (-margin).exp())
    } else {
        let e = margin.exp();
        e / (1.0 + e)
    }
}

/// Inverse of `sigmoid`
pub fn logit(probability: f64) -> f64 {
    (probability / (1.0 - probability)).ln()
}

// ============================================================================
// LABEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "LOW RISK")]
    LowRisk,
    #[serde(rename = "HIGH RISK")]
    HighRisk,
}

impl RiskLabel {
    /// HIGH RISK iff probability is strictly above the threshold
    pub fn from_probability(probability: f64) -> Self {
        if probability > RISK_THRESHOLD {
            RiskLabel::HighRisk
        } else {
            RiskLabel::LowRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::LowRisk => "LOW RISK",
            RiskLabel::HighRisk => "HIGH RISK",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, RiskLabel::HighRisk)
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// BAND
// ============================================================================

/// Coarse probability interpretation for narratives and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskBand {
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.3 {
            RiskBand::VeryLow
        } else if probability < 0.5 {
            RiskBand::Low
        } else if probability < 0.7 {
            RiskBand::Moderate
        } else if probability < 0.85 {
            RiskBand::High
        } else {
            RiskBand::VeryHigh
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskBand::VeryLow => "Very Low Risk - Excellent credit profile",
            RiskBand::Low => "Low Risk - Good credit management",
            RiskBand::Moderate => "Moderate Risk - Some areas need attention",
            RiskBand::High => "High Risk - Significant concerns present",
            RiskBand::VeryHigh => "Very High Risk - Immediate action recommended",
        }
    }
}

// ============================================================================
// PREDICTION
// ============================================================================

/// Scored outcome for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskPrediction {
    probability: f64,
    margin: f64,
    label: RiskLabel,
}

impl RiskPrediction {
    pub fn from_margin(margin: f64) -> Self {
        let probability = sigmoid(margin);
        Self {
            probability,
            margin,
            label: RiskLabel::from_probability(probability),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Raw ensemble output (log-odds)
    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn label(&self) -> RiskLabel {
        self.label
    }

    pub fn band(&self) -> RiskBand {
        RiskBand::from_probability(self.probability)
    }

    pub fn is_high_risk(&self) -> bool {
        self.label.is_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_boundary() {
        assert_eq!(RiskLabel::from_probability(0.5), RiskLabel::LowRisk);
        assert_eq!(RiskLabel::from_probability(0.500001), RiskLabel::HighRisk);
        assert_eq!(RiskPrediction::from_margin(0.0).label(), RiskLabel::LowRisk);
        assert_eq!(RiskPrediction::from_margin(1e-9).label(), RiskLabel::HighRisk);
    }

    #[test]
    fn test_sigmoid_logit_inverse() {
        for p in [0.01, 0.2, 0.5, 0.77, 0.99] {
            assert!((sigmoid(logit(p)) - p).abs() < 1e-12);
        }
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_bands() {
        assert_eq!(RiskBand::from_probability(0.1), RiskBand::VeryLow);
        assert_eq!(RiskBand::from_probability(0.3), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.5), RiskBand::Moderate);
        assert_eq!(RiskBand::from_probability(0.84), RiskBand::High);
        assert_eq!(RiskBand::from_probability(0.85), RiskBand::VeryHigh);
    }

    #[test]
    fn test_label_serialization() {
        let json = serde_json::to_string(&RiskPrediction::from_margin(2.0)).unwrap();
        assert!(json.contains("\"HIGH RISK\""));
        assert_eq!(RiskLabel::LowRisk.to_string(), "LOW RISK");
    }
}
