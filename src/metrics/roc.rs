//! ROC curve construction and trapezoidal AUC.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{ClinicError, Result};
use crate::predictor::round4;

/// Minimum number of samples for a ROC curve.
pub const MIN_ROC_SAMPLES: usize = 2;

/// ROC curve from (0, 0) to (1, 1), co-indexed with the score thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Decision threshold of each point; the first exceeds every score.
    pub thresholds: Vec<f64>,
    /// Area under the curve, rounded to 4 decimals.
    pub auc: f64,
}

/// Compute the ROC curve of binary labels (0/1) against scores.
///
/// Thresholds walk the distinct scores in descending order. Points that are
/// collinear with their neighbours are dropped, which leaves the area
/// unchanged.
pub fn roc_curve(y_true: &[u8], y_score: &[f64]) -> Result<RocCurve> {
    if y_true.len() < MIN_ROC_SAMPLES {
        return Err(ClinicError::InsufficientSamples {
            required: MIN_ROC_SAMPLES,
            actual: y_true.len(),
        });
    }
    if y_score.len() != y_true.len() {
        return Err(ClinicError::InvalidInput(format!(
            "y_true has {} samples but y_prob has {}",
            y_true.len(),
            y_score.len()
        )));
    }
    if let Some(bad) = y_true.iter().find(|&&y| y > 1) {
        return Err(ClinicError::InvalidInput(format!(
            "y_true must contain only 0 and 1, found {bad}"
        )));
    }
    if let Some(bad) = y_score.iter().find(|s| !s.is_finite()) {
        return Err(ClinicError::InvalidInput(format!(
            "y_prob must be finite, found {bad}"
        )));
    }

    // (positives, negatives) per distinct score, highest score first
    let mut by_score: BTreeMap<Reverse<OrderedFloat<f64>>, (u64, u64)> = BTreeMap::new();
    for (&y, &s) in y_true.iter().zip(y_score) {
        let entry = by_score.entry(Reverse(OrderedFloat(s))).or_insert((0, 0));
        if y == 1 {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut tps = Vec::with_capacity(by_score.len());
    let mut fps = Vec::with_capacity(by_score.len());
    let mut thresholds = Vec::with_capacity(by_score.len());
    let (mut tp, mut fp) = (0u64, 0u64);
    for (Reverse(OrderedFloat(score)), (pos, neg)) in &by_score {
        tp += pos;
        fp += neg;
        tps.push(tp);
        fps.push(fp);
        thresholds.push(*score);
    }

    let total_pos = tp;
    let total_neg = fp;
    if total_pos == 0 || total_neg == 0 {
        return Err(ClinicError::InvalidInput(
            "y_true must contain both classes".to_string(),
        ));
    }

    let keep = non_collinear(&fps, &tps);

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thr = vec![thresholds[0] + 1.0];
    for i in keep {
        fpr.push(fps[i] as f64 / total_neg as f64);
        tpr.push(tps[i] as f64 / total_pos as f64);
        thr.push(thresholds[i]);
    }

    let area = auc(&fpr, &tpr)?;
    debug!(samples = y_true.len(), points = fpr.len(), auc = area, "roc curve computed");

    Ok(RocCurve {
        fpr,
        tpr,
        thresholds: thr,
        auc: round4(area),
    })
}

/// Indices whose point is not on the straight line through its neighbours.
fn non_collinear(fps: &[u64], tps: &[u64]) -> Vec<usize> {
    let n = fps.len();
    if n <= 2 {
        return (0..n).collect();
    }
    let bends = |v: &[u64], i: usize| {
        v[i - 1] as i128 - 2 * v[i] as i128 + v[i + 1] as i128 != 0
    };
    (0..n)
        .filter(|&i| i == 0 || i == n - 1 || bends(fps, i) || bends(tps, i))
        .collect()
}

/// Trapezoidal area under a curve whose x values are non-decreasing.
pub fn auc(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(ClinicError::InvalidInput(format!(
            "x has {} points but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(ClinicError::InsufficientSamples {
            required: 2,
            actual: x.len(),
        });
    }
    if x.windows(2).any(|w| w[1] < w[0]) {
        return Err(ClinicError::ComputationFailure(
            "x must be non-decreasing".to_string(),
        ));
    }

    let area = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum::<f64>();
    Ok(area)
}
