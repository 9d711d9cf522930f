//! Ranked disease prediction and thresholded outcome risk.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

use crate::error::{ClinicError, Result};
use crate::features::FeatureVector;
use crate::registry::ModelBundle;

/// Ranked results returned by the disease endpoint.
pub const DEFAULT_TOP_K: usize = 3;

/// Probability at or above which an outcome is "High Risk".
pub const RISK_THRESHOLD: f64 = 0.5;

/// Round to 4 decimal digits.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub disease: String,
    pub confidence: f64,
}

/// Highest-probability classes, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub top3: Vec<RankedLabel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLabel {
    pub fn from_probability(p: f64) -> Self {
        if p >= RISK_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub risk: RiskLabel,
    pub probability: f64,
}

/// Model input for a bundle: the canonical vector, reordered when the bundle
/// declares a recognized feature order.
pub fn model_input<'a>(bundle: &ModelBundle, vector: &'a FeatureVector) -> Result<Cow<'a, [f64]>> {
    let input = match bundle.alignment() {
        Some(order) => Cow::Owned(vector.project(order)),
        None => Cow::Borrowed(vector.as_slice()),
    };
    let expected = bundle.model().input_dim();
    if input.len() != expected {
        return Err(ClinicError::ComputationFailure(format!(
            "model expects {expected} features, vectorizer produced {}",
            input.len()
        )));
    }
    Ok(input)
}

fn probabilities(bundle: &ModelBundle, vector: &FeatureVector) -> Result<Vec<f64>> {
    let input = model_input(bundle, vector)?;
    let probs = bundle.model().predict_proba(&input)?;
    if let Some(bad) = probs.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
        return Err(ClinicError::ComputationFailure(format!(
            "model returned an invalid probability: {bad}"
        )));
    }
    Ok(probs)
}

/// Top `k` labels by probability. Equal probabilities keep label declaration order.
pub fn predict_top_k(bundle: &ModelBundle, vector: &FeatureVector, k: usize) -> Result<RankedPrediction> {
    let probs = probabilities(bundle, vector)?;
    let labels = bundle.labels();
    if probs.len() != labels.len() {
        return Err(ClinicError::ComputationFailure(format!(
            "model returned {} probabilities for {} labels",
            probs.len(),
            labels.len()
        )));
    }

    let mut ranked: Vec<(&String, f64)> = labels.iter().zip(probs).collect();
    // stable sort keeps declaration order among ties
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top3: Vec<RankedLabel> = ranked
        .into_iter()
        .take(k)
        .map(|(label, p)| RankedLabel {
            disease: label.clone(),
            confidence: round4(p),
        })
        .collect();

    debug!(
        best = top3.first().map(|r| r.disease.as_str()).unwrap_or(""),
        returned = top3.len(),
        "disease prediction"
    );
    Ok(RankedPrediction { top3 })
}

/// Positive-class probability thresholded into a risk label.
pub fn predict_risk(bundle: &ModelBundle, vector: &FeatureVector) -> Result<RiskPrediction> {
    let probs = probabilities(bundle, vector)?;
    let p = *probs.get(1).ok_or_else(|| {
        ClinicError::ComputationFailure(format!(
            "binary model returned {} probabilities",
            probs.len()
        ))
    })?;

    let prediction = RiskPrediction {
        risk: RiskLabel::from_probability(p),
        probability: round4(p),
    };
    debug!(risk = %prediction.risk, probability = prediction.probability, "outcome prediction");
    Ok(prediction)
}
