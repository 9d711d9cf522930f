//! Dense neural network inference (CPU-only).
//!
//! Supports small MLPs loaded from JSON for:
//! - binary risk classification (single sigmoid output)
//! - multi-class classification (softmax or per-class outputs)
//!
//! Explicit shape validation happens at load time so a corrupt artifact is
//! rejected before it can serve a request.

use serde::{Deserialize, Serialize};

use crate::error::{ClinicError, Result};
use crate::ml::Classifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
    /// Applied across the whole layer output.
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn in_dim(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    fn out_dim(&self) -> usize {
        self.weights.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected input dimension.
    pub input_dim: usize,

    /// Optional z-score normalization.
    #[serde(default)]
    pub input_mean: Option<Vec<f64>>,
    #[serde(default)]
    pub input_std: Option<Vec<f64>>,

    pub layers: Vec<DenseLayer>,

    /// Optional free-form metadata (versioning, training info, etc).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DenseNetwork {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be > 0".to_string());
        }
        if self.layers.is_empty() {
            return Err("layers must not be empty".to_string());
        }
        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            if mean.len() != self.input_dim {
                return Err(format!(
                    "input_mean length {} != input_dim {}",
                    mean.len(),
                    self.input_dim
                ));
            }
            if std.len() != self.input_dim {
                return Err(format!(
                    "input_std length {} != input_dim {}",
                    std.len(),
                    self.input_dim
                ));
            }
            if std.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err("input_std must be finite and > 0".to_string());
            }
        } else if self.input_mean.is_some() || self.input_std.is_some() {
            return Err("input_mean and input_std must be provided together".to_string());
        }

        let mut expected_in = self.input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return Err(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return Err(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return Err(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return Err(format!("layer[{idx}] bias contain non-finite values"));
            }
            expected_in = layer.out_dim();
        }
        Ok(())
    }

    /// Width of the final layer before any binary expansion.
    pub fn raw_output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim()).unwrap_or(0)
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim {
            return Err(ClinicError::InvalidInput(format!(
                "DenseNetwork input dim mismatch: got {}, expected {}",
                input.len(),
                self.input_dim
            )));
        }

        let mut x: Vec<f64> = input.to_vec();

        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            for i in 0..x.len() {
                let denom = std[i].max(1e-12);
                x[i] = (x[i] - mean[i]) / denom;
            }
        }

        for layer in &self.layers {
            let mut y: Vec<f64> = layer
                .weights
                .iter()
                .zip(layer.bias.iter())
                .map(|(row, b)| {
                    debug_assert_eq!(row.len(), layer.in_dim());
                    b + row.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>()
                })
                .collect();
            activate(&mut y, layer.activation);
            x = y;
        }

        Ok(x)
    }

    fn last_activation(&self) -> Activation {
        self.layers
            .last()
            .map(|l| l.activation)
            .unwrap_or_default()
    }
}

impl Classifier for DenseNetwork {
    fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>> {
        let out = self.forward(input)?;
        if out.iter().any(|v| !v.is_finite()) {
            return Err(ClinicError::ComputationFailure(
                "DenseNetwork produced non-finite output".to_string(),
            ));
        }

        // Single output is the positive-class probability.
        if out.len() == 1 {
            let p = out[0].clamp(0.0, 1.0);
            return Ok(vec![1.0 - p, p]);
        }

        match self.last_activation() {
            Activation::Softmax => Ok(out),
            Activation::Sigmoid => {
                let sum: f64 = out.iter().sum();
                if sum <= 0.0 {
                    return Err(ClinicError::ComputationFailure(
                        "DenseNetwork class scores sum to zero".to_string(),
                    ));
                }
                Ok(out.iter().map(|v| v / sum).collect())
            }
            _ => Ok(softmax(&out)),
        }
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        match self.raw_output_dim() {
            1 => 2,
            n => n,
        }
    }

    fn kind(&self) -> &'static str {
        "dense"
    }
}

fn activate(values: &mut [f64], act: Activation) {
    match act {
        Activation::Linear => {}
        Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
        Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
        Activation::Sigmoid => values.iter_mut().for_each(|v| *v = sigmoid(*v)),
        Activation::Softmax => {
            let probs = softmax(values);
            values.copy_from_slice(&probs);
        }
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

pub(crate) fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![0.0; values.len()];
    }
    let exps: Vec<f64> = values
        .iter()
        .map(|&v| if v.is_finite() { (v - max).exp() } else { 0.0 })
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
