//! Band-pass stage preceding the QRS pipeline.
//!
//! The detector only requires that baseline wander and high-frequency noise
//! are attenuated before the envelope is built; the filter itself is a
//! black box at this interface. Here it is a single-pole high-pass/low-pass
//! cascade with the QRS passband (5–15 Hz) as the default.

/// Default passband edges for QRS energy.
pub const DEFAULT_LOWCUT_HZ: f64 = 5.0;
pub const DEFAULT_HIGHCUT_HZ: f64 = 15.0;

/// Band-pass the signal. A cutoff of zero (or a high cutoff at/above Nyquist)
/// disables that side of the cascade. Output length equals input length.
pub fn bandpass(data: &[f64], fs: f64, lowcut_hz: f64, highcut_hz: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let highpassed = if lowcut_hz > 0.0 {
        single_pole_highpass(data, fs, lowcut_hz)
    } else {
        data.to_vec()
    };
    if highcut_hz <= 0.0 || highcut_hz >= fs * 0.5 {
        highpassed
    } else {
        single_pole_lowpass(&highpassed, fs, highcut_hz)
    }
}

/// Length-match a filter output to the raw signal: truncate when longer,
/// zero-pad when shorter. Filters that preserve length pass through untouched.
pub fn length_match(mut data: Vec<f64>, target_len: usize) -> Vec<f64> {
    if data.len() > target_len {
        data.truncate(target_len);
    } else {
        data.resize(target_len, 0.0);
    }
    data
}

fn single_pole_highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_y = data[0];
    let mut prev_x = data[0];
    for &x in data {
        let y = alpha * (prev_y + x - prev_x);
        out.push(y);
        prev_y = y;
        prev_x = x;
    }
    out
}

fn single_pole_lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut state = data[0];
    for &x in data {
        state += alpha * (x - state);
        out.push(state);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandpass_preserves_length() {
        let data: Vec<f64> = (0..500).map(|i| (i as f64 * 0.1).sin()).collect();
        let out = bandpass(&data, 250.0, DEFAULT_LOWCUT_HZ, DEFAULT_HIGHCUT_HZ);
        assert_eq!(out.len(), data.len());
    }

    #[test]
    fn highpass_removes_dc_offset() {
        let data = vec![5.0; 1000];
        let out = bandpass(&data, 250.0, 5.0, 0.0);
        // constant input settles to zero after the initial transient
        assert!(out.last().unwrap().abs() < 1e-3);
    }

    #[test]
    fn length_match_truncates_and_pads() {
        assert_eq!(length_match(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(length_match(vec![1.0], 3), vec![1.0, 0.0, 0.0]);
        assert_eq!(length_match(vec![1.0, 2.0], 2), vec![1.0, 2.0]);
    }
}
