use serde::{Deserialize, Serialize};

use crate::error::QrsError;

/// Uniformly sampled signal. Immutable once produced by a pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, rejecting a non-positive sampling frequency.
    pub fn new(fs: f64, data: Vec<f64>) -> Result<Self, QrsError> {
        if !(fs > 0.0) {
            return Err(QrsError::InvalidParameter(format!(
                "sampling frequency must be positive, got {fs}"
            )));
        }
        Ok(Self { fs, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Point events on a sample timeline (R-peak indices, beat annotations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True when every index is strictly greater than its predecessor.
    pub fn is_strictly_increasing(&self) -> bool {
        self.indices.windows(2).all(|w| w[0] < w[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_fs() {
        assert!(TimeSeries::new(0.0, vec![1.0]).is_err());
        assert!(TimeSeries::new(-250.0, vec![1.0]).is_err());
        assert!(TimeSeries::new(250.0, vec![1.0]).is_ok());
    }

    #[test]
    fn duration_from_len_and_fs() {
        let ts = TimeSeries::new(250.0, vec![0.0; 500]).unwrap();
        assert!((ts.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn strictly_increasing_check() {
        assert!(Events::from_indices(vec![3, 9, 20]).is_strictly_increasing());
        assert!(!Events::from_indices(vec![3, 3, 9]).is_strictly_increasing());
        assert!(Events::from_indices(Vec::new()).is_strictly_increasing());
    }
}
