use assert_cmd::cargo::cargo_bin_cmd;
use qrs_lib::detectors::adaptive::DetectionSummary;
use qrs_lib::metrics::accuracy::MatchResult;
use qrs_lib::metrics::rr::{ArrhythmiaVerdict, RRStatistics, RhythmClass};
use qrs_lib::signal::Events;
use serde::Deserialize;
use std::{error::Error, io::Write, path::Path};
use tempfile::NamedTempFile;

#[derive(Deserialize)]
struct AnalysisOutput {
    stats: RRStatistics,
    verdict: ArrhythmiaVerdict,
}

#[derive(Deserialize)]
struct ReportOutput {
    summary: DetectionSummary,
    accuracy: Option<MatchResult>,
}

#[test]
fn detect_counts_synthetic_beats() -> Result<(), Box<dyn Error>> {
    let (samples, beats) = synthetic_ecg(250.0, &[0.82, 0.78, 0.8, 0.79, 0.81, 0.77]);
    let input = write_lines(samples.iter().map(|v| v.to_string()))?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args(["detect", "--fs", "250", "--input", path_str(input.path())]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let events: Events = serde_json::from_slice(&output)?;

    assert_eq!(events.indices.len(), beats.len());
    assert!(events.is_strictly_increasing());
    Ok(())
}

#[test]
fn analyze_reports_regular_rhythm() -> Result<(), Box<dyn Error>> {
    let peaks = write_lines((0..6).map(|i| (i * 360).to_string()))?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args(["analyze", "--fs", "360", "--peaks", path_str(peaks.path())]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let actual: AnalysisOutput = serde_json::from_slice(&output)?;

    assert_close(actual.stats.mean_bpm, 60.0, 1e-9);
    assert_close(actual.stats.sdnn, 0.0, 1e-12);
    assert_eq!(actual.verdict.class, RhythmClass::NormalSinus);
    assert_eq!(actual.verdict.flagged_beats, 0);
    Ok(())
}

#[test]
fn score_of_identical_sets_is_perfect() -> Result<(), Box<dyn Error>> {
    let detected = write_lines(["100", "460", "820"].map(String::from))?;
    let reference = write_lines(["100", "460", "820"].map(String::from))?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "score",
        "--fs",
        "360",
        "--detected",
        path_str(detected.path()),
        "--reference",
        path_str(reference.path()),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let result: MatchResult = serde_json::from_slice(&output)?;

    assert_eq!(result.true_positives, 3);
    assert_eq!(result.false_positives, 0);
    assert_eq!(result.false_negatives, 0);
    assert_close(result.sensitivity, 1.0, 1e-12);
    assert_close(result.ppv, 1.0, 1e-12);
    Ok(())
}

#[test]
fn score_accepts_wfdb_annotation_files() -> Result<(), Box<dyn Error>> {
    // Two NORMAL beats at samples 5 and 15, terminated stream.
    let mut atr_bytes = Vec::new();
    atr_bytes.extend(((1u16 << 10) | 5).to_le_bytes());
    atr_bytes.extend(((1u16 << 10) | 10).to_le_bytes());
    atr_bytes.extend(0u16.to_le_bytes());
    let mut atr = tempfile::Builder::new().suffix(".atr").tempfile()?;
    atr.write_all(&atr_bytes)?;
    atr.flush()?;

    let detected = write_lines(["5", "15"].map(String::from))?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "score",
        "--fs",
        "360",
        "--detected",
        path_str(detected.path()),
        "--reference",
        path_str(atr.path()),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let result: MatchResult = serde_json::from_slice(&output)?;

    assert_eq!(result.true_positives, 2);
    assert_close(result.sensitivity, 1.0, 1e-12);
    Ok(())
}

#[test]
fn report_scores_against_annotations() -> Result<(), Box<dyn Error>> {
    let (samples, beats) = synthetic_ecg(250.0, &[0.8, 0.82, 0.79, 0.81, 0.8, 0.78, 0.83]);
    let input = write_lines(samples.iter().map(|v| v.to_string()))?;
    let annotations = write_lines(beats.iter().map(|b| b.to_string()))?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "report",
        "--fs",
        "250",
        "--input",
        path_str(input.path()),
        "--annotations",
        path_str(annotations.path()),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: ReportOutput = serde_json::from_slice(&output)?;

    assert_eq!(report.summary.events.len(), beats.len());
    assert_eq!(report.summary.verdict.class, RhythmClass::NormalSinus);
    let accuracy = report.accuracy.expect("accuracy section");
    assert_eq!(accuracy.true_positives, beats.len());
    assert_eq!(accuracy.false_positives, 0);
    assert_close(accuracy.sensitivity, 1.0, 1e-12);
    Ok(())
}

fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(diff <= tol, "diff {diff} exceeded tol {tol} ({a} vs {b})");
}

fn write_lines(lines: impl IntoIterator<Item = String>) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(file)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

/// Gaussian R-peak bumps over a slow baseline, plus the beat sample indices.
fn synthetic_ecg(fs: f64, rr: &[f64]) -> (Vec<f64>, Vec<usize>) {
    use std::f64::consts::PI;
    let mut beat_times = Vec::with_capacity(rr.len() + 1);
    let mut t = 0.5;
    beat_times.push(t);
    for &interval in rr {
        t += interval;
        beat_times.push(t);
    }
    let duration = beat_times.last().copied().unwrap_or(1.0) + 1.0;
    let samples = (duration * fs) as usize;
    let mut data = Vec::with_capacity(samples);
    for i in 0..samples {
        let time = i as f64 / fs;
        let mut v = 0.05 * (2.0 * PI * time).sin();
        for &bt in &beat_times {
            let width = 0.02;
            v += 1.2 * (-0.5 * ((time - bt) / width).powi(2)).exp();
        }
        data.push(v);
    }
    let beat_indices = beat_times.iter().map(|bt| (bt * fs).round() as usize).collect();
    (data, beat_indices)
}
