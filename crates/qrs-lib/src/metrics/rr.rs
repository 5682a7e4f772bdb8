//! RR-interval statistics and rhythm classification.

use serde::{Deserialize, Serialize};

use crate::{error::QrsError, signal::Events};

/// Flag intervals outside `[mean/factor, mean*factor]` as ectopic.
pub const DEFAULT_ECTOPIC_FACTOR: f64 = 1.2;

/// SDNN above this (seconds) marks the whole recording as irregular.
const IRREGULAR_SDNN_S: f64 = 0.15;

/// Interval statistics derived from a beat sequence. Degenerates to all
/// zeros below 2 peaks: "no rhythm data" is informative, not fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RRStatistics {
    /// RR intervals in seconds.
    pub rr_intervals: Vec<f64>,
    /// Mean of the instantaneous 60/RR values (not 60 over the mean RR).
    pub mean_bpm: f64,
    /// Population standard deviation of the RR intervals.
    pub sdnn: f64,
    /// Root-mean-square of successive RR differences.
    pub rmssd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhythmClass {
    NormalSinus,
    IrregularRhythm,
    OccasionalEctopic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrhythmiaVerdict {
    pub class: RhythmClass,
    /// Number of RR intervals outside the ectopic band, whichever class won.
    pub flagged_beats: usize,
}

pub fn rr_statistics(events: &Events, fs: f64) -> Result<RRStatistics, QrsError> {
    if !(fs > 0.0) {
        return Err(QrsError::InvalidParameter(format!(
            "sampling frequency must be positive, got {fs}"
        )));
    }
    if !events.is_strictly_increasing() {
        return Err(QrsError::InvalidParameter(
            "peak indices must be strictly increasing".into(),
        ));
    }
    let rr: Vec<f64> = events
        .indices
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / fs)
        .collect();
    if rr.is_empty() {
        return Ok(RRStatistics {
            rr_intervals: rr,
            mean_bpm: 0.0,
            sdnn: 0.0,
            rmssd: 0.0,
        });
    }
    let n = rr.len() as f64;
    let mean_bpm = rr.iter().map(|&x| 60.0 / x).sum::<f64>() / n;
    let mean_rr = rr.iter().sum::<f64>() / n;
    let sdnn = (rr.iter().map(|x| (x - mean_rr).powi(2)).sum::<f64>() / n).sqrt();
    let rmssd = if rr.len() > 1 {
        let sum_sq: f64 = rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
        (sum_sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    Ok(RRStatistics {
        rr_intervals: rr,
        mean_bpm,
        sdnn,
        rmssd,
    })
}

/// Classify the rhythm: high overall variability first, then isolated
/// out-of-band intervals. The flagged count is reported either way.
pub fn classify_rhythm(stats: &RRStatistics, threshold_factor: f64) -> ArrhythmiaVerdict {
    let rr = &stats.rr_intervals;
    if rr.is_empty() {
        return ArrhythmiaVerdict {
            class: RhythmClass::NormalSinus,
            flagged_beats: 0,
        };
    }
    let mean_rr = rr.iter().sum::<f64>() / rr.len() as f64;
    let lower = mean_rr / threshold_factor;
    let upper = mean_rr * threshold_factor;
    let flagged_beats = rr.iter().filter(|&&x| x < lower || x > upper).count();

    let class = if stats.sdnn > IRREGULAR_SDNN_S {
        RhythmClass::IrregularRhythm
    } else if flagged_beats > 0 {
        RhythmClass::OccasionalEctopic
    } else {
        RhythmClass::NormalSinus
    };
    ArrhythmiaVerdict {
        class,
        flagged_beats,
    }
}
