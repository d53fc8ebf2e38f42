//! Posture classifier seam and the random-forest model shipped with the app.

use super::types::{FeatureVector, TWO_HANDS_LEN};
use crate::error::ClassifierError;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::path::Path;

/// Stateless posture classifier.
pub trait PostureClassifier: Send + Sync {
    /// Probability of the "correct posture" class for one row of
    /// [`TWO_HANDS_LEN`] values.
    fn probability_correct(&self, row: &[f32]) -> Result<f32, ClassifierError>;

    /// Validates a two-hand reading and classifies it.
    ///
    /// Absent coordinates cannot be fed to the model and fail with
    /// [`ClassifierError::MissingFeature`].
    fn classify(&self, features: &FeatureVector) -> Result<f32, ClassifierError> {
        if features.len() != TWO_HANDS_LEN {
            return Err(ClassifierError::WrongLength {
                expected: TWO_HANDS_LEN,
                actual: features.len(),
            });
        }
        let row = features
            .coords()
            .iter()
            .enumerate()
            .map(|(i, c)| c.ok_or(ClassifierError::MissingFeature(i)))
            .collect::<Result<Vec<f32>, _>>()?;
        self.probability_correct(&row)
    }
}

/// One node of an exported decision tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TreeNode {
    /// `row[feature] <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Per-class sample counts (or weights) at the leaf.
    Leaf { value: Vec<f32> },
}

#[derive(Debug, Clone, Deserialize)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

/// Forest as written in the model file, before validation.
#[derive(Debug, Deserialize)]
struct ForestFile {
    n_features: usize,
    #[serde(default = "default_positive_class")]
    positive_class: usize,
    trees: Vec<DecisionTree>,
}

/// Random forest exported to JSON.
///
/// ```json
/// {"n_features": 42, "positive_class": 1,
///  "trees": [{"nodes": [{"feature": 0, "threshold": 0.4, "left": 1, "right": 2},
///                       {"value": [8.0, 2.0]}, {"value": [1.0, 9.0]}]}]}
/// ```
///
/// Deserializing always validates, so every loaded forest can be walked
/// without bounds failures.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    n_features: usize,
    positive_class: usize,
    trees: Vec<DecisionTree>,
}

impl<'de> Deserialize<'de> for ForestClassifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let file = ForestFile::deserialize(deserializer)?;
        let model = Self {
            n_features: file.n_features,
            positive_class: file.positive_class,
            trees: file.trees,
        };
        model.validate().map_err(de::Error::custom)?;
        Ok(model)
    }
}

const fn default_positive_class() -> usize {
    1
}

impl ForestClassifier {
    /// Loads and validates a model file.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path).map_err(|e| ClassifierError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let model = Self::from_json(&content).map_err(|e| ClassifierError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = ?path, trees = model.trees.len(), "Classifier model loaded");
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        serde_json::from_str(json).map_err(|e| ClassifierError::InvalidModel(e.to_string()))
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Checks shape and that every walk terminates (children always follow
    /// their parent).
    fn validate(&self) -> Result<(), ClassifierError> {
        if self.n_features != TWO_HANDS_LEN {
            return Err(ClassifierError::InvalidModel(format!(
                "model expects {} features, monitor produces {}",
                self.n_features, TWO_HANDS_LEN
            )));
        }
        if self.trees.is_empty() {
            return Err(ClassifierError::InvalidModel("forest has no trees".into()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ClassifierError::InvalidModel(format!("tree {t} is empty")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(ClassifierError::InvalidModel(format!(
                                "tree {t} node {i} splits on feature {feature}"
                            )));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(ClassifierError::InvalidModel(format!(
                                    "tree {t} node {i} has invalid child {child}"
                                )));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() <= self.positive_class {
                            return Err(ClassifierError::InvalidModel(format!(
                                "tree {t} leaf {i} has {} classes",
                                value.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn tree_probability(&self, tree: &DecisionTree, row: &[f32]) -> f32 {
        let mut index = 0;
        loop {
            match &tree.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => {
                    let total: f32 = value.iter().sum();
                    return if total > 0.0 {
                        value[self.positive_class] / total
                    } else {
                        0.0
                    };
                }
            }
        }
    }
}

impl PostureClassifier for ForestClassifier {
    fn probability_correct(&self, row: &[f32]) -> Result<f32, ClassifierError> {
        if row.len() != self.n_features {
            return Err(ClassifierError::WrongLength {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let sum: f32 = self
            .trees
            .iter()
            .map(|tree| self.tree_probability(tree, row))
            .sum();
        Ok(sum / self.trees.len() as f32)
    }
}
