//! Model diagnostics: ROC, confusion matrices, feature importance and
//! offline evaluation reports.

pub mod confusion;
pub mod importance;
pub mod report;
pub mod roc;

pub use confusion::{confusion_matrix, confusion_matrix_with_labels, ClassLabel, ConfusionMatrix};
pub use importance::{feature_importance, FeatureScore};
pub use report::{evaluate, ConfusionArtifact, EvaluationReport, ImportanceArtifact, LabelledRecord};
pub use roc::{auc, roc_curve, RocCurve, MIN_ROC_SAMPLES};
