//! The immutable service object every request goes through.

use tracing::info;

use crate::config::AppConfig;
use crate::error::{ClinicError, Result};
use crate::features::{Record, Vectorizer};
use crate::metrics::{self, ConfusionMatrix, EvaluationReport, FeatureScore, LabelledRecord, RocCurve};
use crate::predictor::{self, RankedPrediction, RiskPrediction, DEFAULT_TOP_K};
use crate::registry::{ModelRegistry, Task};

/// Registry, vectorizer and prediction settings, built once at startup and
/// shared read-only (by reference or `Arc`) across requests.
#[derive(Debug, Clone)]
pub struct ClinicService {
    registry: ModelRegistry,
    vectorizer: Vectorizer,
    top_k: usize,
}

impl Default for ClinicService {
    fn default() -> Self {
        Self::new(ModelRegistry::default(), Vectorizer::default(), DEFAULT_TOP_K)
    }
}

impl ClinicService {
    pub fn new(registry: ModelRegistry, vectorizer: Vectorizer, top_k: usize) -> Self {
        Self {
            registry,
            vectorizer,
            top_k,
        }
    }

    /// Validate the configuration and load both bundles from their configured paths.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|problems| ClinicError::Validation(problems.join("; ")))?;

        let registry = ModelRegistry::load(&config.models);
        let vectorizer = Vectorizer::new(config.vectorizer.age_policy);
        info!(
            age_policy = ?vectorizer.age_policy(),
            top_k = config.prediction.top_k,
            "clinic service ready"
        );
        Ok(Self::new(registry, vectorizer, config.prediction.top_k))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ranked disease labels for one patient record.
    pub fn predict_disease(&self, record: &Record) -> Result<RankedPrediction> {
        let bundle = self.registry.require(Task::Disease)?;
        let vector = self.vectorizer.vectorize(record)?;
        predictor::predict_top_k(bundle, &vector, self.top_k)
    }

    /// Outcome risk for one patient record.
    pub fn predict_outcome(&self, record: &Record) -> Result<RiskPrediction> {
        let bundle = self.registry.require(Task::Outcome)?;
        let vector = self.vectorizer.vectorize(record)?;
        predictor::predict_risk(bundle, &vector)
    }

    /// Disease-model feature importance; empty when no disease model is loaded.
    pub fn feature_importance(&self) -> Vec<FeatureScore> {
        metrics::feature_importance(self.registry.get(Task::Disease))
    }

    pub fn roc(&self, y_true: &[u8], y_score: &[f64]) -> Result<RocCurve> {
        metrics::roc_curve(y_true, y_score)
    }

    pub fn confusion_matrix<T: Ord + Clone>(&self, y_true: &[T], y_pred: &[T]) -> Result<ConfusionMatrix<T>> {
        metrics::confusion_matrix(y_true, y_pred)
    }

    pub fn evaluate(&self, dataset: &[LabelledRecord]) -> Result<EvaluationReport> {
        metrics::evaluate(&self.registry, &self.vectorizer, dataset)
    }
}
