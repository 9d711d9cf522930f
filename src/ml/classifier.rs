use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ClinicError, Result};
use crate::ml::{DenseNetwork, TreeEnsemble};

/// A fitted classifier producing a probability distribution over classes.
#[cfg_attr(test, mockall::automock)]
pub trait Classifier: Send + Sync {
    /// Per-class probabilities for a single input row.
    fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>>;

    /// Most probable class index; ties resolve to the lowest index.
    fn predict(&self, input: &[f64]) -> Result<usize> {
        let probs = self.predict_proba(input)?;
        argmax(&probs).ok_or_else(|| {
            ClinicError::ComputationFailure("classifier returned no probabilities".to_string())
        })
    }

    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    /// Native per-feature importance, in input order, when the model has one.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// Split counts keyed by feature name, when the model has them.
    fn importance_by_weight(&self) -> Option<HashMap<String, f64>> {
        None
    }

    fn kind(&self) -> &'static str;
}

pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Serialized model section of a bundle artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Dense(DenseNetwork),
    TreeEnsemble(TreeEnsemble),
}

impl ModelSpec {
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Dense(net) => net.validate(),
            Self::TreeEnsemble(trees) => trees.validate(),
        }
    }

    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        match self {
            Self::Dense(net) => Arc::new(net),
            Self::TreeEnsemble(trees) => Arc::new(trees),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_of_equal_maxima() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[f64::NAN, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    struct Fixed(Vec<f64>);

    impl Classifier for Fixed {
        fn predict_proba(&self, _input: &[f64]) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }

        fn input_dim(&self) -> usize {
            8
        }

        fn output_dim(&self) -> usize {
            self.0.len()
        }

        fn kind(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn default_predict_uses_probabilities() {
        let model = Fixed(vec![0.1, 0.7, 0.2]);
        assert_eq!(model.predict(&[0.0; 8]).unwrap(), 1);
        assert!(model.feature_importances().is_none());
        assert!(model.importance_by_weight().is_none());
    }

    #[test]
    fn default_predict_fails_on_empty_distribution() {
        let err = Fixed(Vec::new()).predict(&[0.0; 8]).unwrap_err();
        assert!(matches!(err, ClinicError::ComputationFailure(_)));
    }

    #[test]
    fn model_spec_is_tagged_by_kind() {
        let raw = r#"{
            "kind": "dense",
            "input_dim": 1,
            "layers": [{"weights": [[1.0]], "bias": [0.0], "activation": "sigmoid"}]
        }"#;
        let spec: ModelSpec = serde_json::from_str(raw).unwrap();
        assert!(matches!(spec, ModelSpec::Dense(_)));
        assert!(spec.validate().is_ok());
        assert_eq!(spec.into_classifier().kind(), "dense");
    }
}
