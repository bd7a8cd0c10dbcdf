//! Regression trees of a boosted ensemble
//!
//! Each tree is a flat node array rooted at index 0. A split sends a
//! sample left iff `x[feature] < threshold`. Leaf values are in margin
//! (log-odds) space.

use serde::{Deserialize, Serialize};

/// Deepest root-to-leaf path accepted (explanation walks recurse per level)
pub const MAX_TREE_DEPTH: usize = 64;

/// One tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Training samples (hessian sum) reaching this node
        cover: f64,
        /// Loss reduction of this split
        gain: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Split statistics used for importance
#[derive(Debug, Clone, Copy)]
pub struct SplitInfo {
    pub feature: usize,
    pub gain: f64,
    pub cover: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Wrap nodes without checking them; see `validate`
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Single-leaf tree
    pub fn leaf(value: f64, cover: f64) -> Self {
        Self::new(vec![Node::Leaf { value, cover }])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural check against a feature count.
    ///
    /// Children must come after their parent and every non-root node must
    /// have exactly one parent, so the node array is a proper tree.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        let mut parents = vec![0usize; self.nodes.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover <= 0.0 {
                return Err(format!("node {} has invalid cover {}", i, cover));
            }

            match node {
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has non-finite value", i));
                    }
                }
                Node::Split { feature, threshold, left, right, gain, .. } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} (only {} features)",
                            i, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() || !gain.is_finite() {
                        return Err(format!("node {} has non-finite threshold or gain", i));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child index {}", i, child));
                        }
                        parents[child] += 1;
                    }
                    if left == right {
                        return Err(format!("node {} has identical children", i));
                    }
                }
            }
        }

        if let Some(orphan) = (1..self.nodes.len()).find(|&i| parents[i] != 1) {
            return Err(format!("node {} is not reachable exactly once", orphan));
        }

        let depth = self.max_depth();
        if depth > MAX_TREE_DEPTH {
            return Err(format!("tree depth {} exceeds {}", depth, MAX_TREE_DEPTH));
        }

        Ok(())
    }

    /// Index of the leaf `values` falls into
    pub fn leaf_index(&self, values: &[f64]) -> usize {
        let mut index = 0;
        while let Some(Node::Split { feature, threshold, left, right, .. }) = self.nodes.get(index) {
            index = if values[*feature] < *threshold { *left } else { *right };
        }
        index
    }

    /// Margin contribution of this tree
    pub fn predict(&self, values: &[f64]) -> f64 {
        match self.nodes.get(self.leaf_index(values)) {
            Some(Node::Leaf { value, .. }) => *value,
            _ => 0.0,
        }
    }

    /// Cover-weighted mean leaf value (the tree's output with no features known)
    pub fn expected_value(&self) -> f64 {
        self.expected_value_at(0)
    }

    fn expected_value_at(&self, index: usize) -> f64 {
        match &self.nodes[index] {
            Node::Leaf { value, .. } => *value,
            Node::Split { left, right, .. } => {
                let left_cover = self.nodes[*left].cover();
                let right_cover = self.nodes[*right].cover();
                (left_cover * self.expected_value_at(*left)
                    + right_cover * self.expected_value_at(*right))
                    / (left_cover + right_cover)
            }
        }
    }

    /// Longest root-to-leaf path, in edges
    pub fn max_depth(&self) -> usize {
        let mut depth = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                depth[*left] = depth[i] + 1;
                depth[*right] = depth[i] + 1;
                max = max.max(depth[i] + 1);
            }
        }
        max
    }

    pub fn splits(&self) -> impl Iterator<Item = SplitInfo> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            Node::Split { feature, gain, cover, .. } => Some(SplitInfo {
                feature: *feature,
                gain: *gain,
                cover: *cover,
            }),
            Node::Leaf { .. } => None,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::fixtures;

    fn stump() -> Tree {
        Tree::new(vec![
            Node::Split { feature: 0, threshold: 10.0, left: 1, right: 2, cover: 100.0, gain: 5.0 },
            Node::Leaf { value: -1.0, cover: 75.0 },
            Node::Leaf { value: 3.0, cover: 25.0 },
        ])
    }

    #[test]
    fn test_routing_is_strict_less_than() {
        let tree = stump();
        assert_eq!(tree.predict(&[9.99]), -1.0);
        assert_eq!(tree.predict(&[10.0]), 3.0);
        assert_eq!(tree.leaf_index(&[10.0]), 2);
    }

    #[test]
    fn test_expected_value_is_cover_weighted() {
        let tree = stump();
        assert!((tree.expected_value() - 0.0).abs() < 1e-12);
        assert_eq!(Tree::leaf(0.4, 1.0).expected_value(), 0.4);
    }

    #[test]
    fn test_validate_accepts_stump() {
        assert!(stump().validate(1).is_ok());
        assert_eq!(stump().max_depth(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        assert!(Tree::new(vec![]).validate(1).is_err());
        // feature out of range
        assert!(stump().validate(0).is_err());

        let backwards = Tree::new(vec![
            Node::Leaf { value: 0.0, cover: 1.0 },
            Node::Split { feature: 0, threshold: 1.0, left: 0, right: 2, cover: 1.0, gain: 0.0 },
            Node::Leaf { value: 0.0, cover: 1.0 },
        ]);
        assert!(backwards.validate(1).is_err());

        let orphan = Tree::new(vec![
            Node::Split { feature: 0, threshold: 1.0, left: 1, right: 2, cover: 2.0, gain: 0.0 },
            Node::Leaf { value: 0.0, cover: 1.0 },
            Node::Leaf { value: 0.0, cover: 1.0 },
            Node::Leaf { value: 0.0, cover: 1.0 },
        ]);
        assert!(orphan.validate(1).is_err());

        let zero_cover = Tree::new(vec![Node::Leaf { value: 0.0, cover: 0.0 }]);
        assert!(zero_cover.validate(1).is_err());

        let nan_leaf = Tree::new(vec![Node::Leaf { value: f64::NAN, cover: 1.0 }]);
        assert!(nan_leaf.validate(1).is_err());
    }

    #[test]
    fn test_validate_bounds_depth() {
        let at_limit = fixtures::chain_tree(MAX_TREE_DEPTH);
        assert_eq!(at_limit.max_depth(), MAX_TREE_DEPTH);
        assert!(at_limit.validate(1).is_ok());

        let too_deep = fixtures::chain_tree(MAX_TREE_DEPTH + 1);
        let reason = too_deep.validate(1).unwrap_err();
        assert!(reason.contains("depth"));
    }

    #[test]
    fn test_node_serde_shape() {
        let json = serde_json::to_value(&Node::Leaf { value: 0.5, cover: 2.0 }).unwrap();
        assert_eq!(json["kind"], "leaf");
        let back: Node = serde_json::from_value(json).unwrap();
        assert!(back.is_leaf());
    }
}
