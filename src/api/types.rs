use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::ClassLabel;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RocRequest {
    /// 0/1 integers or booleans.
    #[serde(default)]
    pub y_true: Vec<Value>,
    #[serde(default)]
    pub y_prob: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfusionRequest {
    #[serde(default)]
    pub y_true: Vec<ClassLabel>,
    #[serde(default)]
    pub y_pred: Vec<ClassLabel>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocResponse {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub auc: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
