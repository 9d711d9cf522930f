//! Per-feature importance of a fitted model.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::predictor::round4;
use crate::registry::ModelBundle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: String,
    pub importance: f64,
}

/// One score per declared feature, in the bundle's feature order.
///
/// Prefers the model's native importances; otherwise looks split counts up
/// by feature name, with 0.0 for features the model never used. No bundle
/// yields an empty list.
pub fn feature_importance(bundle: Option<&ModelBundle>) -> Vec<FeatureScore> {
    let Some(bundle) = bundle else {
        return Vec::new();
    };
    let features = bundle.features();
    let model = bundle.model();

    let scores: Vec<f64> = match model.feature_importances() {
        Some(native) if native.len() == features.len() => {
            debug!(kind = model.kind(), "using native feature importances");
            native
        }
        native => {
            if let Some(native) = native {
                warn!(
                    importances = native.len(),
                    features = features.len(),
                    "native importances do not match declared features, using split weights"
                );
            }
            match model.importance_by_weight() {
                Some(weights) => features
                    .iter()
                    .map(|f| weights.get(f).copied().unwrap_or(0.0))
                    .collect(),
                None => vec![0.0; features.len()],
            }
        }
    };

    features
        .iter()
        .zip(scores)
        .map(|(feature, score)| FeatureScore {
            feature: feature.clone(),
            importance: round4(score),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MockClassifier;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_bundle_is_empty() {
        assert!(feature_importance(None).is_empty());
    }

    #[test]
    fn native_importances_are_rounded_and_co_indexed() {
        let mut mock = MockClassifier::new();
        mock.expect_kind().return_const("mock");
        mock.expect_feature_importances()
            .returning(|| Some(vec![0.123456, 0.876544]));
        let bundle = ModelBundle::new(Arc::new(mock), Vec::new(), names(&["age", "fever"]));

        let scores = feature_importance(Some(&bundle));
        assert_eq!(
            scores,
            vec![
                FeatureScore {
                    feature: "age".into(),
                    importance: 0.1235
                },
                FeatureScore {
                    feature: "fever".into(),
                    importance: 0.8765
                },
            ]
        );
    }

    #[test]
    fn falls_back_to_weights_by_name() {
        let mut mock = MockClassifier::new();
        mock.expect_feature_importances().returning(|| None);
        mock.expect_importance_by_weight().returning(|| {
            let mut w = HashMap::new();
            w.insert("fever".to_string(), 12.0);
            w.insert("unused".to_string(), 3.0);
            Some(w)
        });
        let bundle = ModelBundle::new(Arc::new(mock), Vec::new(), names(&["age", "fever"]));

        let scores = feature_importance(Some(&bundle));
        assert_eq!(scores[0].importance, 0.0);
        assert_eq!(scores[1].importance, 12.0);
    }

    #[test]
    fn mismatched_native_length_uses_weights() {
        let mut mock = MockClassifier::new();
        mock.expect_feature_importances()
            .returning(|| Some(vec![1.0]));
        mock.expect_importance_by_weight().returning(|| None);
        let bundle = ModelBundle::new(Arc::new(mock), Vec::new(), names(&["age", "fever"]));

        let scores = feature_importance(Some(&bundle));
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.importance == 0.0));
    }
}
