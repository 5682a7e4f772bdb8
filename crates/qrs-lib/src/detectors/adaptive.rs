//! Adaptive dual-threshold QRS detector.
//!
//! The detector scans the integrated waveform once, left to right, keeping
//! exponentially-weighted running estimates of signal-peak (SPKI) and
//! noise-peak (NPKI) amplitude. A candidate above the primary threshold is not
//! accepted immediately: it opens a 200 ms look-ahead window in which a larger
//! candidate may supersede it. Accepted beats are spaced by a 150 ms
//! refractory period, candidates close to the previous beat are screened
//! against a T-wave amplitude rule, and a searchback pass over a lowered
//! threshold recovers beats after abnormally long gaps.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::QrsError,
    filter,
    metrics::rr::{classify_rhythm, rr_statistics, ArrhythmiaVerdict, RRStatistics},
    preprocess,
    signal::{Events, TimeSeries},
};

/// Refractory period: minimum spacing after an accepted beat (seconds).
const REFRACTORY_S: f64 = 0.15;
/// Look-ahead window in which a larger candidate supersedes a pending one.
const QRS_WINDOW_S: f64 = 0.20;
/// Candidates closer than this to the last beat are screened as T-waves.
const T_WAVE_WINDOW_S: f64 = 0.36;
/// Searchback triggers when no beat is found for this multiple of the mean RR.
const SEARCHBACK_LIMIT_FACTOR: f64 = 1.66;
/// Bounded RR history length.
const RR_HISTORY_LEN: usize = 8;

/// Tunable knobs for the front half of the pipeline (filter + envelope).
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Lower band-pass cutoff (Hz).
    pub lowcut_hz: f64,
    /// Upper band-pass cutoff (Hz).
    pub highcut_hz: f64,
    /// Moving-average integration window (seconds).
    pub integration_window_s: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: filter::DEFAULT_LOWCUT_HZ,
            highcut_hz: filter::DEFAULT_HIGHCUT_HZ,
            integration_window_s: preprocess::DEFAULT_INTEGRATION_WINDOW_S,
        }
    }
}

/// Look-ahead confirmation sub-state of the scan.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Idle,
    Candidate { idx: usize, val: f64 },
}

/// Running estimates and accepted peaks, owned by one `solve` call.
#[derive(Debug, Clone)]
struct DetectorState {
    spki: f64,
    npki: f64,
    threshold_primary: f64,
    threshold_secondary: f64,
    last_qrs_val: f64,
    rr_history: VecDeque<usize>,
    peaks: Vec<usize>,
}

impl DetectorState {
    fn new() -> Self {
        Self {
            spki: 0.0,
            npki: 0.0,
            threshold_primary: 0.0,
            threshold_secondary: 0.0,
            last_qrs_val: 0.0,
            rr_history: VecDeque::with_capacity(RR_HISTORY_LEN),
            peaks: Vec::new(),
        }
    }

    fn update_thresholds(&mut self) {
        self.threshold_primary = self.npki + 0.25 * (self.spki - self.npki);
        self.threshold_secondary = 0.5 * self.threshold_primary;
    }

    fn mean_rr(&self) -> Option<f64> {
        if self.rr_history.is_empty() {
            return None;
        }
        Some(self.rr_history.iter().sum::<usize>() as f64 / self.rr_history.len() as f64)
    }

    /// Record the RR interval ending at the just-accepted peak. An interval
    /// longer than twice the mean history is not admitted, so one missed or
    /// extra beat cannot pollute the searchback trigger.
    fn push_rr(&mut self) {
        if self.peaks.len() < 2 {
            return;
        }
        let rr = self.peaks[self.peaks.len() - 1] - self.peaks[self.peaks.len() - 2];
        let admit = match self.mean_rr() {
            None => true,
            Some(mean) => (rr as f64) < 2.0 * mean,
        };
        if admit {
            self.rr_history.push_back(rr);
            if self.rr_history.len() > RR_HISTORY_LEN {
                self.rr_history.pop_front();
            }
        }
    }
}

/// Single-use detector: build with `new`, consume one integrated waveform
/// with `solve`.
pub struct AdaptiveDetector {
    fs: f64,
    refractory: usize,
    qrs_window: usize,
    t_wave_window: usize,
    state: DetectorState,
}

impl AdaptiveDetector {
    pub fn new(fs: f64) -> Result<Self, QrsError> {
        if !(fs > 0.0) {
            return Err(QrsError::InvalidParameter(format!(
                "sampling frequency must be positive, got {fs}"
            )));
        }
        Ok(Self {
            fs,
            refractory: (REFRACTORY_S * fs) as usize,
            qrs_window: (QRS_WINDOW_S * fs) as usize,
            t_wave_window: (T_WAVE_WINDOW_S * fs) as usize,
            state: DetectorState::new(),
        })
    }

    /// Scan the integrated waveform once and return accepted peak indices,
    /// strictly increasing.
    pub fn solve(mut self, signal: &[f64]) -> Vec<usize> {
        self.init_thresholds(signal);

        let candidates = local_maxima(signal);
        let mut last_qrs_index = 0usize;
        let mut pending = Pending::Idle;

        for &peak_idx in &candidates {
            let peak_val = signal[peak_idx];

            if let Pending::Candidate { idx, val } = pending {
                if peak_idx - idx < self.qrs_window {
                    // Still inside the confirmation window: a larger peak
                    // takes over as the candidate, anything else waits.
                    if peak_val > val {
                        pending = Pending::Candidate {
                            idx: peak_idx,
                            val: peak_val,
                        };
                    }
                    continue;
                }
                // Window elapsed: the pending candidate faces the final checks
                // and the current peak falls through as a fresh candidate.
                if let Some(accepted) = self.finalize_peak(idx, val, last_qrs_index) {
                    last_qrs_index = accepted;
                }
                pending = Pending::Idle;
            }

            if peak_idx - last_qrs_index < self.refractory {
                continue;
            }

            if peak_val >= self.state.threshold_primary {
                pending = Pending::Candidate {
                    idx: peak_idx,
                    val: peak_val,
                };
            } else {
                self.state.npki = 0.125 * peak_val + 0.875 * self.state.npki;
                self.state.update_thresholds();

                // No beat for 1.66x the recent mean RR: rescan the gap with
                // the lowered threshold.
                let avg_rr = self.state.mean_rr().unwrap_or(self.fs);
                if (peak_idx - last_qrs_index) as f64 > SEARCHBACK_LIMIT_FACTOR * avg_rr {
                    if let Some(found) = self.searchback(signal, last_qrs_index, peak_idx) {
                        last_qrs_index = found;
                        // A recovered beat discards the pending candidate
                        // without re-evaluating it.
                        pending = Pending::Idle;
                    }
                }
            }
        }

        if let Pending::Candidate { idx, val } = pending {
            self.finalize_peak(idx, val, last_qrs_index);
        }

        self.state.peaks
    }

    /// Seed SPKI/NPKI from the first two seconds of signal, or fall back to
    /// fixed defaults when no samples are available.
    fn init_thresholds(&mut self, signal: &[f64]) {
        let init_len = signal.len().min(2 * self.fs as usize);
        let window = &signal[..init_len];
        if window.is_empty() {
            self.state.spki = 0.5;
            self.state.npki = 0.1;
        } else {
            let max = window.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            self.state.spki = max * 0.25;
            self.state.npki = mean * 0.5;
        }
        self.state.update_thresholds();
    }

    /// Final checks for a pending candidate whose window has elapsed. Returns
    /// the accepted index, or None when the candidate is re-classified as a
    /// T-wave.
    fn finalize_peak(&mut self, idx: usize, val: f64, last_qrs_index: usize) -> Option<usize> {
        let dt = idx - last_qrs_index;
        if dt < self.t_wave_window && val < 0.5 * self.state.last_qrs_val {
            // T-wave mimicking a QRS complex: feed the noise estimate.
            self.state.npki = 0.125 * val + 0.875 * self.state.npki;
            self.state.update_thresholds();
            debug!("rejected T-wave candidate at sample {idx} (dt {dt} samples)");
            return None;
        }
        self.state.peaks.push(idx);
        self.state.spki = 0.125 * val + 0.875 * self.state.spki;
        self.state.last_qrs_val = val;
        self.state.push_rr();
        self.state.update_thresholds();
        Some(idx)
    }

    /// Scan the gap between the last accepted beat (plus refractory) and the
    /// current candidate for the highest sample; accept it against the
    /// secondary threshold.
    fn searchback(&mut self, signal: &[f64], last_qrs_index: usize, end: usize) -> Option<usize> {
        let start = last_qrs_index + self.refractory;
        if end <= start {
            return None;
        }
        let window = &signal[start..end];
        let mut best = 0usize;
        for (i, &v) in window.iter().enumerate() {
            if v > window[best] {
                best = i;
            }
        }
        let peak_val = window[best];
        let real_idx = start + best;
        if peak_val > self.state.threshold_secondary {
            self.state.peaks.push(real_idx);
            // Recovered beats pull SPKI harder than primary-path beats.
            self.state.spki = 0.25 * peak_val + 0.75 * self.state.spki;
            self.state.last_qrs_val = peak_val;
            self.state.push_rr();
            self.state.update_thresholds();
            debug!("searchback recovered beat at sample {real_idx}");
            Some(real_idx)
        } else {
            None
        }
    }
}

/// Candidate peaks: strict local maxima where the first difference flips from
/// positive to non-positive (a flat-topped peak counts once, at entry).
fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    for i in 1..signal.len().saturating_sub(1) {
        let rise = signal[i] - signal[i - 1];
        let fall = signal[i + 1] - signal[i];
        if rise > 0.0 && fall <= 0.0 {
            out.push(i);
        }
    }
    out
}

/// Detect beats on an already-integrated waveform.
pub fn detect(envelope: &TimeSeries) -> Result<Events, QrsError> {
    let detector = AdaptiveDetector::new(envelope.fs)?;
    Ok(Events::from_indices(detector.solve(&envelope.data)))
}

/// Full pipeline: band-pass → derivative → square → integration → detection.
pub fn detect_r_peaks(ts: &TimeSeries, cfg: &PipelineConfig) -> Result<Events, QrsError> {
    if ts.is_empty() {
        return Ok(Events::from_indices(Vec::new()));
    }
    let filtered = filter::bandpass(&ts.data, ts.fs, cfg.lowcut_hz, cfg.highcut_hz);
    let filtered = filter::length_match(filtered, ts.len());
    let envelope = preprocess::qrs_envelope(
        &TimeSeries {
            fs: ts.fs,
            data: filtered,
        },
        cfg.integration_window_s,
    )?;
    detect(&envelope)
}

/// Combined result of detection plus downstream rhythm analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub fs: f64,
    pub sample_count: usize,
    pub events: Events,
    pub stats: RRStatistics,
    pub verdict: ArrhythmiaVerdict,
}

impl DetectionSummary {
    pub fn from_events(ts: &TimeSeries, events: Events) -> Result<Self, QrsError> {
        let stats = rr_statistics(&events, ts.fs)?;
        let verdict = classify_rhythm(&stats, crate::metrics::rr::DEFAULT_ECTOPIC_FACTOR);
        Ok(Self {
            fs: ts.fs,
            sample_count: ts.len(),
            events,
            stats,
            verdict,
        })
    }
}

/// Detect beats and derive interval statistics and a rhythm verdict in one
/// shot.
pub fn run_detection_pipeline(
    ts: &TimeSeries,
    cfg: &PipelineConfig,
) -> Result<DetectionSummary, QrsError> {
    let events = detect_r_peaks(ts, cfg)?;
    DetectionSummary::from_events(ts, events)
}
