use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::Path;

use crate::signal::TimeSeries;

/// Load one column of a CSV ECG export as a TimeSeries. When a `timestamp`
/// column is present the sampling rate is inferred from the first two rows;
/// otherwise `default_fs` is used.
pub fn read_ecg_csv(path: &Path, column: &str, default_fs: f64) -> Result<TimeSeries> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let value_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .with_context(|| format!("missing signal column '{}'", column))?;
    let timestamp_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("timestamp"));

    let mut data = Vec::new();
    let mut last_ts = None;
    let mut fs = 0.0;
    for record in reader.records() {
        let record = record.context("reading record")?;
        let value_str = record
            .get(value_idx)
            .ok_or_else(|| anyhow::anyhow!("row is missing the signal column"))?;
        let value: f64 = value_str
            .parse()
            .with_context(|| format!("parsing signal value {}", value_str))?;
        if let Some(idx) = timestamp_idx {
            let ts_str = record
                .get(idx)
                .ok_or_else(|| anyhow::anyhow!("row is missing the timestamp column"))?;
            let ts: f64 = ts_str
                .parse()
                .with_context(|| format!("parsing timestamp {}", ts_str))?;
            if let Some(prev) = last_ts {
                if fs == 0.0 && ts > prev {
                    fs = 1.0 / (ts - prev);
                }
            }
            last_ts = Some(ts);
        }
        data.push(value);
    }
    if fs <= 0.0 {
        fs = default_fs;
    }
    Ok(TimeSeries { fs, data })
}
