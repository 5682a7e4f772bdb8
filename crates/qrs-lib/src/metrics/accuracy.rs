//! Detection accuracy against annotated ground truth.

use serde::{Deserialize, Serialize};

use crate::error::QrsError;

/// Matching tolerance when the caller does not supply one.
pub const DEFAULT_TOLERANCE_MS: f64 = 100.0;

/// Matching counts and derived rates. Ratios with a zero denominator are
/// defined as 0 rather than an error: an empty reference or detection set is
/// a valid, uninformative comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// TP / (TP + FN)
    pub sensitivity: f64,
    /// TP / (TP + FP)
    pub ppv: f64,
    /// Mean absolute timing error over matched beats (milliseconds).
    pub mae_ms: f64,
    /// Root-mean-square timing error over matched beats (milliseconds).
    pub rmse_ms: f64,
}

/// Match each detected peak to its closest reference peak (earliest wins on
/// ties). A within-tolerance match counts as a true positive and consumes the
/// reference from the unmatched set at most once; reference peaks never
/// consumed are false negatives.
pub fn score_detection(
    detected: &[usize],
    reference: &[usize],
    fs: f64,
    tolerance_ms: f64,
) -> Result<MatchResult, QrsError> {
    if !(fs > 0.0) {
        return Err(QrsError::InvalidParameter(format!(
            "sampling frequency must be positive, got {fs}"
        )));
    }
    if tolerance_ms < 0.0 {
        return Err(QrsError::InvalidParameter(format!(
            "tolerance must be non-negative, got {tolerance_ms} ms"
        )));
    }
    let tolerance_samples = (tolerance_ms / 1000.0 * fs) as i64;

    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut errors_ms: Vec<f64> = Vec::new();
    let mut unmatched = vec![true; reference.len()];

    for &d in detected {
        let closest = reference
            .iter()
            .enumerate()
            .min_by_key(|(_, &r)| (d as i64 - r as i64).abs());
        let Some((j, &r)) = closest else {
            false_positives += 1;
            continue;
        };
        let delta = d as i64 - r as i64;
        if delta.abs() <= tolerance_samples {
            true_positives += 1;
            errors_ms.push(delta as f64 / fs * 1000.0);
            unmatched[j] = false;
        } else {
            false_positives += 1;
        }
    }
    let false_negatives = unmatched.iter().filter(|&&u| u).count();

    let sensitivity = ratio_or_zero(true_positives, true_positives + false_negatives);
    let ppv = ratio_or_zero(true_positives, true_positives + false_positives);
    let (mae_ms, rmse_ms) = if errors_ms.is_empty() {
        (0.0, 0.0)
    } else {
        let n = errors_ms.len() as f64;
        let mae = errors_ms.iter().map(|e| e.abs()).sum::<f64>() / n;
        let rmse = (errors_ms.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
        (mae, rmse)
    };

    Ok(MatchResult {
        true_positives,
        false_positives,
        false_negatives,
        sensitivity,
        ppv,
        mae_ms,
        rmse_ms,
    })
}

fn ratio_or_zero(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
