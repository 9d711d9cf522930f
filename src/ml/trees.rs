//! Gradient-boosted tree ensembles exported from a boosting library dump.
//!
//! Each tree is a flat node list rooted at index 0. A split sends a row to
//! `yes` when `x[feature] < threshold`, to `no` otherwise, and to `missing`
//! (defaulting to `yes`) for NaN inputs. Tree `i` adds its leaf value to the
//! margin of class `i % num_class`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ClinicError, Result};
use crate::ml::dense::{sigmoid, softmax};
use crate::ml::Classifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    BinaryLogistic,
    MultiSoftprob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Leaf {
        leaf: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        #[serde(default)]
        missing: Option<usize>,
        #[serde(default)]
        gain: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub objective: Objective,
    #[serde(default = "default_num_class")]
    pub num_class: usize,
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub num_features: usize,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub trees: Vec<Vec<TreeNode>>,
}

fn default_num_class() -> usize {
    1
}

fn default_base_score() -> f64 {
    0.5
}

impl TreeEnsemble {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.num_features == 0 {
            return Err("num_features must be > 0".to_string());
        }
        if self.trees.is_empty() {
            return Err("trees must not be empty".to_string());
        }
        match self.objective {
            Objective::BinaryLogistic => {
                if self.num_class > 2 {
                    return Err(format!(
                        "binary_logistic expects num_class <= 2, got {}",
                        self.num_class
                    ));
                }
                if !(self.base_score > 0.0 && self.base_score < 1.0) {
                    return Err(format!(
                        "binary_logistic base_score must be in (0, 1), got {}",
                        self.base_score
                    ));
                }
            }
            Objective::MultiSoftprob => {
                if self.num_class < 2 {
                    return Err(format!(
                        "multi_softprob expects num_class >= 2, got {}",
                        self.num_class
                    ));
                }
                if self.trees.len() % self.num_class != 0 {
                    return Err(format!(
                        "tree count {} is not a multiple of num_class {}",
                        self.trees.len(),
                        self.num_class
                    ));
                }
                if !self.base_score.is_finite() {
                    return Err("base_score must be finite".to_string());
                }
            }
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.num_features {
                return Err(format!(
                    "feature_names length {} != num_features {}",
                    names.len(),
                    self.num_features
                ));
            }
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.is_empty() {
                return Err(format!("tree[{t}] has no nodes"));
            }
            for (n, node) in tree.iter().enumerate() {
                match node {
                    TreeNode::Leaf { leaf } => {
                        if !leaf.is_finite() {
                            return Err(format!("tree[{t}] node {n} leaf is non-finite"));
                        }
                    }
                    TreeNode::Split {
                        feature,
                        threshold,
                        yes,
                        no,
                        missing,
                        ..
                    } => {
                        if *feature >= self.num_features {
                            return Err(format!(
                                "tree[{t}] node {n} splits on feature {feature} >= num_features {}",
                                self.num_features
                            ));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree[{t}] node {n} threshold is non-finite"));
                        }
                        // children must come after their parent so traversal terminates
                        for child in [Some(*yes), Some(*no), *missing].into_iter().flatten() {
                            if child <= n || child >= tree.len() {
                                return Err(format!(
                                    "tree[{t}] node {n} has invalid child {child}"
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn num_groups(&self) -> usize {
        match self.objective {
            Objective::BinaryLogistic => 1,
            Objective::MultiSoftprob => self.num_class,
        }
    }

    fn feature_name(&self, index: usize) -> String {
        self.feature_names
            .as_ref()
            .and_then(|names| names.get(index).cloned())
            .unwrap_or_else(|| format!("f{index}"))
    }

    fn leaf_value(tree: &[TreeNode], input: &[f64]) -> Result<f64> {
        let mut idx = 0;
        // a well-formed path visits each node at most once
        for _ in 0..=tree.len() {
            match tree.get(idx) {
                Some(TreeNode::Leaf { leaf }) => return Ok(*leaf),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                    ..
                }) => {
                    let x = *input.get(*feature).ok_or_else(|| {
                        ClinicError::ComputationFailure(format!(
                            "split on feature {feature} outside input of length {}",
                            input.len()
                        ))
                    })?;
                    idx = if x.is_nan() {
                        missing.unwrap_or(*yes)
                    } else if x < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
                None => {
                    return Err(ClinicError::ComputationFailure(format!(
                        "tree traversal reached missing node {idx}"
                    )))
                }
            }
        }
        Err(ClinicError::ComputationFailure(
            "tree traversal did not reach a leaf".to_string(),
        ))
    }

    /// Raw per-group margins before the link function.
    pub fn margins(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.num_features {
            return Err(ClinicError::InvalidInput(format!(
                "TreeEnsemble input dim mismatch: got {}, expected {}",
                input.len(),
                self.num_features
            )));
        }

        let groups = self.num_groups();
        let start = match self.objective {
            Objective::BinaryLogistic => (self.base_score / (1.0 - self.base_score)).ln(),
            Objective::MultiSoftprob => self.base_score,
        };
        let mut margins = vec![start; groups];
        for (i, tree) in self.trees.iter().enumerate() {
            margins[i % groups] += Self::leaf_value(tree, input)?;
        }
        Ok(margins)
    }
}

impl Classifier for TreeEnsemble {
    fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>> {
        let margins = self.margins(input)?;
        match self.objective {
            Objective::BinaryLogistic => {
                let p = sigmoid(margins[0]);
                Ok(vec![1.0 - p, p])
            }
            Objective::MultiSoftprob => Ok(softmax(&margins)),
        }
    }

    fn input_dim(&self) -> usize {
        self.num_features
    }

    fn output_dim(&self) -> usize {
        match self.objective {
            Objective::BinaryLogistic => 2,
            Objective::MultiSoftprob => self.num_class,
        }
    }

    /// Normalized total gain per feature. Only available when every split records its gain.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let mut totals = vec![0.0; self.num_features];
        for node in self.trees.iter().flatten() {
            if let TreeNode::Split { feature, gain, .. } = node {
                *totals.get_mut(*feature)? += (*gain)?;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return None;
        }
        Some(totals.into_iter().map(|g| g / sum).collect())
    }

    fn importance_by_weight(&self) -> Option<HashMap<String, f64>> {
        let mut counts: HashMap<String, f64> = HashMap::new();
        for node in self.trees.iter().flatten() {
            if let TreeNode::Split { feature, .. } = node {
                *counts.entry(self.feature_name(*feature)).or_insert(0.0) += 1.0;
            }
        }
        Some(counts)
    }

    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }
}
