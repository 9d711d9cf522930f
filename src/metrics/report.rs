//! Offline evaluation of the outcome model against a labelled dataset.
//!
//! Produces the three diagnostic artifacts published alongside trained
//! bundles: feature importance, ROC data, and the risk confusion matrix.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::confusion::confusion_matrix_with_labels;
use super::importance::{feature_importance, FeatureScore};
use super::roc::{roc_curve, RocCurve};
use crate::error::{ClinicError, Result};
use crate::features::{Record, Vectorizer};
use crate::predictor::{model_input, RiskLabel};
use crate::registry::{ModelRegistry, Task};

pub const IMPORTANCE_FILE: &str = "feature_importance.json";
pub const ROC_FILE: &str = "roc_data.json";
pub const CONFUSION_FILE: &str = "confusion_matrix.json";

/// One evaluation sample: a patient record and its observed binary outcome.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelledRecord {
    pub record: Record,
    pub label: u8,
}

/// Importance as parallel name/score lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceArtifact {
    pub features: Vec<String>,
    pub importance: Vec<f64>,
}

impl From<Vec<FeatureScore>> for ImportanceArtifact {
    fn from(scores: Vec<FeatureScore>) -> Self {
        let (features, importance) = scores
            .into_iter()
            .map(|s| (s.feature, s.importance))
            .unzip();
        Self {
            features,
            importance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionArtifact {
    pub matrix: Vec<Vec<u64>>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub feature_importance: ImportanceArtifact,
    pub roc: RocCurve,
    pub confusion: ConfusionArtifact,
}

impl EvaluationReport {
    /// Write the three artifacts into `dir`, creating it if needed.
    pub fn write_artifacts(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let written = vec![
            write_json(dir.join(IMPORTANCE_FILE), &self.feature_importance)?,
            write_json(dir.join(ROC_FILE), &self.roc)?,
            write_json(dir.join(CONFUSION_FILE), &self.confusion)?,
        ];
        info!(dir = %dir.display(), files = written.len(), "evaluation artifacts written");
        Ok(written)
    }
}

fn write_json<T: Serialize>(path: PathBuf, value: &T) -> Result<PathBuf> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(&path, body)?;
    Ok(path)
}

/// Score every sample with the outcome model and summarise the results.
///
/// Importance is read from the disease bundle and is empty when that slot is
/// absent; the outcome bundle is required.
pub fn evaluate(
    registry: &ModelRegistry,
    vectorizer: &Vectorizer,
    dataset: &[LabelledRecord],
) -> Result<EvaluationReport> {
    let bundle = registry.require(Task::Outcome)?;

    let mut y_true = Vec::with_capacity(dataset.len());
    let mut y_score = Vec::with_capacity(dataset.len());
    let mut y_pred = Vec::with_capacity(dataset.len());
    for (i, sample) in dataset.iter().enumerate() {
        if sample.label > 1 {
            return Err(ClinicError::InvalidInput(format!(
                "sample {i}: label must be 0 or 1, found {}",
                sample.label
            )));
        }
        let vector = vectorizer.vectorize(&sample.record)?;
        let input = model_input(bundle, &vector)?;
        let probs = bundle.model().predict_proba(&input)?;
        let positive = *probs.get(1).ok_or_else(|| {
            ClinicError::ComputationFailure(format!(
                "sample {i}: binary model returned {} probabilities",
                probs.len()
            ))
        })?;
        let predicted = bundle.model().predict(&input)?;
        if predicted > 1 {
            return Err(ClinicError::ComputationFailure(format!(
                "sample {i}: binary model predicted class {predicted}"
            )));
        }

        y_true.push(sample.label);
        y_score.push(positive);
        y_pred.push(predicted as u8);
    }

    let roc = roc_curve(&y_true, &y_score)?;
    let cm = confusion_matrix_with_labels(&y_true, &y_pred, &[0, 1])?;
    let confusion = ConfusionArtifact {
        matrix: cm.matrix,
        labels: [RiskLabel::Low, RiskLabel::High]
            .iter()
            .map(|l| l.as_str().to_string())
            .collect(),
    };
    let importance = feature_importance(registry.get(Task::Disease)).into();

    debug!(samples = dataset.len(), auc = roc.auc, "evaluation complete");
    Ok(EvaluationReport {
        samples: dataset.len(),
        feature_importance: importance,
        roc,
        confusion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::AgePolicy;
    use crate::ml::MockClassifier;
    use crate::registry::ModelBundle;
    use serde_json::json;
    use std::sync::Arc;

    fn sample(age: f64, label: u8) -> LabelledRecord {
        let record = json!({ "Age": age }).as_object().cloned().unwrap();
        LabelledRecord { record, label }
    }

    /// Outcome model whose positive probability is age / 100.
    fn age_scored_registry() -> ModelRegistry {
        let mut mock = MockClassifier::new();
        mock.expect_input_dim().return_const(8usize);
        mock.expect_predict_proba().returning(|x| {
            let p = x[4] / 100.0;
            Ok(vec![1.0 - p, p])
        });
        mock.expect_predict()
            .returning(|x| Ok(usize::from(x[4] >= 50.0)));
        let outcome = ModelBundle::new(Arc::new(mock), Vec::new(), Vec::new());
        ModelRegistry::new(None, Some(outcome))
    }

    fn dataset() -> Vec<LabelledRecord> {
        vec![sample(10.0, 0), sample(40.0, 0), sample(35.0, 1), sample(80.0, 1)]
    }

    #[test]
    fn evaluates_outcome_model() {
        let report = evaluate(
            &age_scored_registry(),
            &Vectorizer::new(AgePolicy::Lenient),
            &dataset(),
        )
        .unwrap();
        assert_eq!(report.samples, 4);
        assert_eq!(report.roc.auc, 0.75);
        assert_eq!(report.confusion.matrix, vec![vec![2, 0], vec![1, 1]]);
        assert_eq!(report.confusion.labels, vec!["Low Risk", "High Risk"]);
        assert!(report.feature_importance.features.is_empty());
    }

    #[test]
    fn requires_outcome_bundle() {
        let err = evaluate(
            &ModelRegistry::default(),
            &Vectorizer::default(),
            &dataset(),
        )
        .unwrap_err();
        assert!(matches!(err, ClinicError::ModelNotLoaded(Task::Outcome)));
    }

    #[test]
    fn rejects_non_binary_labels() {
        let mut data = dataset();
        data[0].label = 3;
        let err = evaluate(&age_scored_registry(), &Vectorizer::default(), &data).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn writes_three_artifacts() {
        let report = evaluate(&age_scored_registry(), &Vectorizer::default(), &dataset()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let written = report.write_artifacts(dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 3);

        let confusion: ConfusionArtifact = serde_json::from_str(
            &fs::read_to_string(dir.path().join("out").join(CONFUSION_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(confusion, report.confusion);

        let roc: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("out").join(ROC_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(roc["auc"], json!(0.75));
        assert!(roc["thresholds"].is_array());
    }

    #[test]
    fn importance_artifact_splits_scores() {
        let artifact: ImportanceArtifact = vec![
            FeatureScore {
                feature: "age".into(),
                importance: 0.7,
            },
            FeatureScore {
                feature: "fever".into(),
                importance: 0.3,
            },
        ]
        .into();
        assert_eq!(artifact.features, vec!["age", "fever"]);
        assert_eq!(artifact.importance, vec![0.7, 0.3]);
    }
}
