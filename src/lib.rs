pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod ml;
pub mod predictor;
pub mod registry;
pub mod service;

pub use config::AppConfig;
pub use error::{ClinicError, Result};
pub use features::{vectorize, AgePolicy, Feature, FeatureVector, Record, Vectorizer};
pub use metrics::{
    auc, confusion_matrix, evaluate, feature_importance, roc_curve, ClassLabel, ConfusionMatrix,
    EvaluationReport, FeatureScore, LabelledRecord, RocCurve,
};
pub use ml::{Classifier, DenseNetwork, ModelSpec, TreeEnsemble};
pub use predictor::{predict_risk, predict_top_k, RankedLabel, RankedPrediction, RiskLabel, RiskPrediction};
pub use registry::{ModelBundle, ModelRegistry, Task};
pub use service::ClinicService;
