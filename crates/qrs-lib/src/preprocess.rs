//! Pure transforms turning a band-pass-filtered signal into the integrated
//! waveform whose peaks track QRS energy: derivative → square → moving-average
//! integration.

use crate::error::QrsError;
use crate::signal::TimeSeries;

/// Fraction of a second covered by the default integration window.
pub const DEFAULT_INTEGRATION_WINDOW_S: f64 = 0.05;

/// Numerical gradient with respect to the sampling period `Ts = 1/fs`:
/// centered differences at interior points, one-sided at both ends.
/// Output length equals input length.
pub fn differentiate(data: &[f64], fs: f64) -> Result<Vec<f64>, QrsError> {
    if !(fs > 0.0) {
        return Err(QrsError::InvalidParameter(format!(
            "sampling frequency must be positive, got {fs}"
        )));
    }
    if data.len() < 2 {
        return Err(QrsError::InsufficientData(
            "need at least 2 samples to differentiate".into(),
        ));
    }
    let ts = 1.0 / fs;
    let n = data.len();
    let mut out = vec![0.0; n];
    out[0] = (data[1] - data[0]) / ts;
    for i in 1..n - 1 {
        out[i] = (data[i + 1] - data[i - 1]) / (2.0 * ts);
    }
    out[n - 1] = (data[n - 1] - data[n - 2]) / ts;
    Ok(out)
}

/// Element-wise square: drops sign, emphasizes high-slope regions.
pub fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

/// Uniform moving average in "valid" convolution mode: the window never runs
/// off either edge, so the output has `len - window + 1` samples.
pub fn moving_average(data: &[f64], window: usize) -> Result<Vec<f64>, QrsError> {
    if window == 0 {
        return Err(QrsError::InvalidParameter(
            "integration window must be at least 1 sample".into(),
        ));
    }
    if window > data.len() {
        return Err(QrsError::InvalidParameter(format!(
            "integration window of {} samples exceeds signal length {}",
            window,
            data.len()
        )));
    }
    let norm = 1.0 / window as f64;
    let mut out = Vec::with_capacity(data.len() - window + 1);
    let mut acc: f64 = data[..window].iter().sum();
    out.push(acc * norm);
    for i in window..data.len() {
        acc += data[i] - data[i - window];
        out.push(acc * norm);
    }
    Ok(out)
}

/// Composite pipeline producing the integrated waveform handed to the
/// detector. The integration window is `integration_window_s × fs` rounded,
/// never below one sample.
pub fn qrs_envelope(ts: &TimeSeries, integration_window_s: f64) -> Result<TimeSeries, QrsError> {
    let derivative = differentiate(&ts.data, ts.fs)?;
    let squared = square(&derivative);
    let window = ((integration_window_s * ts.fs).round() as usize).max(1);
    let integrated = moving_average(&squared, window)?;
    Ok(TimeSeries {
        fs: ts.fs,
        data: integrated,
    })
}
