//! Model bundles and the process-wide registry that owns them.
//!
//! A bundle is a fitted classifier plus the ordered class labels and
//! feature names it was trained with. Bundles are loaded once at startup,
//! never mutated, and shared read-only across requests.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ModelsConfig;
use crate::error::{ClinicError, Result};
use crate::features::Feature;
use crate::ml::{Classifier, ModelSpec};

/// The prediction tasks served, one registry slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Multi-class disease classification
    Disease,
    /// Binary outcome-risk classification
    Outcome,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disease => write!(f, "Disease"),
            Self::Outcome => write!(f, "Outcome"),
        }
    }
}

/// On-disk bundle layout.
#[derive(Debug, Deserialize)]
struct BundleArtifact {
    model: ModelSpec,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default, alias = "feature_labels")]
    features: Vec<String>,
}

/// A loaded model with its label and feature metadata.
#[derive(Clone)]
pub struct ModelBundle {
    model: Arc<dyn Classifier>,
    labels: Vec<String>,
    features: Vec<String>,
    /// Canonical-feature order the model expects, when every declared name is recognized.
    alignment: Option<Vec<Feature>>,
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("kind", &self.model.kind())
            .field("labels", &self.labels)
            .field("features", &self.features)
            .finish()
    }
}

impl ModelBundle {
    pub fn new(model: Arc<dyn Classifier>, labels: Vec<String>, features: Vec<String>) -> Self {
        let alignment = Feature::resolve_all(&features);
        Self {
            model,
            labels,
            features,
            alignment,
        }
    }

    /// Load a bundle artifact, reporting any failure through the log instead of the caller.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "model bundle not found");
            return None;
        }
        match Self::try_load(path) {
            Ok(bundle) => {
                info!(
                    path = %path.display(),
                    kind = bundle.model.kind(),
                    labels = bundle.labels.len(),
                    features = bundle.features.len(),
                    "model bundle loaded"
                );
                Some(bundle)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed loading model bundle");
                None
            }
        }
    }

    /// Load a bundle artifact, returning the failure reason.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let artifact: BundleArtifact = serde_json::from_str(&content)?;
        artifact.model.validate().map_err(ClinicError::Validation)?;

        let bundle = Self::new(
            artifact.model.into_classifier(),
            artifact.labels,
            artifact.features,
        );
        bundle.validate().map_err(ClinicError::Validation)?;
        Ok(bundle)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !self.labels.is_empty() && self.labels.len() != self.model.output_dim() {
            return Err(format!(
                "label count {} != model output_dim {}",
                self.labels.len(),
                self.model.output_dim()
            ));
        }
        if let Some(order) = &self.alignment {
            if order.len() != self.model.input_dim() {
                return Err(format!(
                    "declared feature count {} != model input_dim {}",
                    order.len(),
                    self.model.input_dim()
                ));
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn alignment(&self) -> Option<&[Feature]> {
        self.alignment.as_deref()
    }
}

/// Holds one optional bundle per task. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    disease: Option<ModelBundle>,
    outcome: Option<ModelBundle>,
}

impl ModelRegistry {
    pub fn new(disease: Option<ModelBundle>, outcome: Option<ModelBundle>) -> Self {
        Self { disease, outcome }
    }

    /// Load both slots from their configured paths. Either may end up empty.
    pub fn load(models: &ModelsConfig) -> Self {
        let registry = Self::new(
            ModelBundle::load(&models.disease_path),
            ModelBundle::load(&models.outcome_path),
        );
        info!(
            disease = registry.disease.is_some(),
            outcome = registry.outcome.is_some(),
            "model registry initialized"
        );
        registry
    }

    pub fn get(&self, task: Task) -> Option<&ModelBundle> {
        match task {
            Task::Disease => self.disease.as_ref(),
            Task::Outcome => self.outcome.as_ref(),
        }
    }

    /// Bundle for a task, or `ModelNotLoaded`.
    pub fn require(&self, task: Task) -> Result<&ModelBundle> {
        self.get(task).ok_or(ClinicError::ModelNotLoaded(task))
    }

    pub fn is_loaded(&self, task: Task) -> bool {
        self.get(task).is_some()
    }
}
