//! Confusion matrices over arbitrary ordered labels.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::error::{ClinicError, Result};

/// Class label as sent by clients: integer codes or class names.
///
/// Booleans and whole-valued floats are read as integer codes, so `1.0`,
/// `true` and `1` name the same class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawLabel> for ClassLabel {
    type Error = String;

    fn try_from(raw: RawLabel) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawLabel::Bool(b) => Ok(Self::Int(i64::from(b))),
            RawLabel::Int(v) => Ok(Self::Int(v)),
            RawLabel::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => {
                Ok(Self::Int(x as i64))
            }
            RawLabel::Float(x) => Err(format!("class label {x} is not a whole number")),
            RawLabel::Text(s) => Ok(Self::Text(s)),
        }
    }
}

impl<'de> Deserialize<'de> for ClassLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawLabel::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Count grid with rows = true label, columns = predicted label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix<T> {
    /// Row and column order.
    pub labels: Vec<T>,
    pub matrix: Vec<Vec<u64>>,
}

impl<T: Ord> ConfusionMatrix<T> {
    fn position(&self, label: &T) -> Option<usize> {
        self.labels.binary_search(label).ok()
    }

    pub fn get(&self, actual: &T, predicted: &T) -> u64 {
        match (self.position(actual), self.position(predicted)) {
            (Some(r), Some(c)) => self.matrix[r][c],
            _ => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.matrix.iter().flatten().sum()
    }

    /// Fraction of samples on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.labels.len()).map(|i| self.matrix[i][i]).sum();
        correct as f64 / total as f64
    }

    /// TP / (TP + FP) for one label; 0 when the label was never predicted.
    pub fn precision(&self, label: &T) -> f64 {
        let Some(c) = self.position(label) else {
            return 0.0;
        };
        let predicted: u64 = self.matrix.iter().map(|row| row[c]).sum();
        if predicted == 0 {
            return 0.0;
        }
        self.matrix[c][c] as f64 / predicted as f64
    }

    /// TP / (TP + FN) for one label; 0 when the label never occurs.
    pub fn recall(&self, label: &T) -> f64 {
        let Some(r) = self.position(label) else {
            return 0.0;
        };
        let actual: u64 = self.matrix[r].iter().sum();
        if actual == 0 {
            return 0.0;
        }
        self.matrix[r][r] as f64 / actual as f64
    }
}

/// Confusion matrix over the sorted union of labels seen in either array.
pub fn confusion_matrix<T: Ord + Clone>(y_true: &[T], y_pred: &[T]) -> Result<ConfusionMatrix<T>> {
    check_lengths(y_true, y_pred)?;
    let labels: BTreeSet<&T> = y_true.iter().chain(y_pred.iter()).collect();
    let labels: Vec<T> = labels.into_iter().cloned().collect();
    confusion_matrix_with_labels(y_true, y_pred, &labels)
}

/// Confusion matrix over a fixed label order (which must be sorted and cover every sample).
pub fn confusion_matrix_with_labels<T: Ord + Clone>(
    y_true: &[T],
    y_pred: &[T],
    labels: &[T],
) -> Result<ConfusionMatrix<T>> {
    check_lengths(y_true, y_pred)?;
    if labels.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ClinicError::InvalidInput(
            "labels must be sorted and unique".to_string(),
        ));
    }

    let mut cm = ConfusionMatrix {
        labels: labels.to_vec(),
        matrix: vec![vec![0u64; labels.len()]; labels.len()],
    };
    for (t, p) in y_true.iter().zip(y_pred) {
        match (cm.position(t), cm.position(p)) {
            (Some(r), Some(c)) => cm.matrix[r][c] += 1,
            _ => {
                return Err(ClinicError::InvalidInput(
                    "sample label outside the declared label set".to_string(),
                ))
            }
        }
    }

    debug!(samples = y_true.len(), labels = labels.len(), "confusion matrix computed");
    Ok(cm)
}

fn check_lengths<T>(y_true: &[T], y_pred: &[T]) -> Result<()> {
    if y_true.is_empty() {
        return Err(ClinicError::InsufficientSamples {
            required: 1,
            actual: 0,
        });
    }
    if y_true.len() != y_pred.len() {
        return Err(ClinicError::InvalidInput(format!(
            "y_true has {} samples but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}
