use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::signal::{Events, TimeSeries};

// Pseudo-annotation type codes of the MIT annotation format.
const SKIP: u8 = 59;
const AUX: u8 = 63;

/// MIT-BIH annotation codes that mark an actual beat. Rhythm changes,
/// signal-quality flags, and other non-beat markers are excluded before the
/// annotations reach the accuracy scorer.
const BEAT_CODES: [u8; 17] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 25, 34, 35, 38];

/// One entry of a WFDB annotation stream.
#[derive(Debug, Clone)]
pub struct WfdbAnnotation {
    pub sample: usize,
    pub code: u8,
}

impl WfdbAnnotation {
    pub fn is_beat(&self) -> bool {
        BEAT_CODES.contains(&self.code)
    }
}

/// Load one lead of a WFDB header/signal pair, scaled to physical units via
/// the header's ADC gain and baseline.
pub fn load_wfdb_lead(header_path: &Path, lead: usize) -> Result<TimeSeries> {
    let (header, signals) = wfdb_rust::parse_wfdb(header_path);
    if lead >= signals.len() {
        anyhow::bail!(
            "record contains {} leads, but lead {} was requested",
            signals.len(),
            lead
        );
    }
    let spec = &header.signal_specs[lead];
    let raw = &signals[lead];
    let gain = spec.adc_gain.unwrap_or(1.0) as f64;
    let baseline = spec.baseline.or(spec.adc_zero).unwrap_or(0) as f64;
    let fs = header
        .record
        .sampling_frequency
        .map(|f| f as f64)
        .unwrap_or(360.0);
    let data = raw
        .iter()
        .map(|&sample| (sample as f64 - baseline) / gain)
        .collect();
    Ok(TimeSeries { fs, data })
}

/// Decode the MIT annotation byte stream: 2-byte little-endian words carrying
/// a 6-bit type code and a 10-bit time delta. SKIP extends the delta by a
/// 4-byte interval, NUM/SUB/CHN carry field values without advancing time,
/// and AUX payloads are even-padded.
pub fn parse_wfdb_annotations(buf: &[u8]) -> Vec<WfdbAnnotation> {
    let mut out = Vec::new();
    let mut idx = 0;
    let mut sample: usize = 0;
    while idx + 2 <= buf.len() {
        let word = u16::from_le_bytes([buf[idx], buf[idx + 1]]);
        idx += 2;
        let code = (word >> 10) as u8;
        let payload = (word & 0x03FF) as usize;
        match code {
            0 if payload == 0 => break, // end of stream
            SKIP => {
                if idx + 4 > buf.len() {
                    break;
                }
                let high = u16::from_le_bytes([buf[idx], buf[idx + 1]]) as u32;
                let low = u16::from_le_bytes([buf[idx + 2], buf[idx + 3]]) as u32;
                idx += 4;
                sample = sample.wrapping_add(((high << 16) | low) as usize);
            }
            60..=62 => {} // NUM/SUB/CHN: field modifiers, no time delta
            AUX => {
                idx += payload + (payload & 1);
            }
            _ => {
                sample = sample.wrapping_add(payload);
                out.push(WfdbAnnotation { sample, code });
            }
        }
    }
    out
}

/// Read a WFDB annotation (`.atr`) file and keep only beat events.
pub fn load_wfdb_events(path: &Path) -> Result<Events> {
    let buf =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let beat_samples: Vec<usize> = parse_wfdb_annotations(&buf)
        .into_iter()
        .filter(WfdbAnnotation::is_beat)
        .map(|ann| ann.sample)
        .collect();
    Ok(Events::from_indices(beat_samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(code: u16, payload: u16) -> [u8; 2] {
        ((code << 10) | payload).to_le_bytes()
    }

    #[test]
    fn decodes_annotation_stream_with_skip() {
        let mut bytes = Vec::new();
        // NORMAL at +5, PVC at +10
        bytes.extend(word(1, 5));
        bytes.extend(word(5, 10));
        // SKIP forward 5000 samples, then another NORMAL at +3
        bytes.extend(word(59, 0));
        bytes.extend(0x0000u16.to_le_bytes());
        bytes.extend(0x1388u16.to_le_bytes());
        bytes.extend(word(1, 3));
        // terminator
        bytes.extend(word(0, 0));

        let annotations = parse_wfdb_annotations(&bytes);
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[0].sample, 5);
        assert_eq!(annotations[1].sample, 15);
        assert_eq!(annotations[2].sample, 5018);
    }

    #[test]
    fn field_modifiers_do_not_advance_time() {
        let mut bytes = Vec::new();
        bytes.extend(word(1, 5));
        bytes.extend(word(61, 2)); // SUB
        bytes.extend(word(62, 1)); // CHN
        bytes.extend(word(1, 7));
        bytes.extend(word(0, 0));

        let annotations = parse_wfdb_annotations(&bytes);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[1].sample, 12);
    }

    #[test]
    fn aux_payload_is_skipped_with_padding() {
        let mut bytes = Vec::new();
        bytes.extend(word(1, 5));
        bytes.extend(word(63, 3)); // 3 payload bytes, padded to 4
        bytes.extend([b'a', b'f', b'b', 0]);
        bytes.extend(word(1, 6));
        bytes.extend(word(0, 0));

        let annotations = parse_wfdb_annotations(&bytes);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[1].sample, 11);
    }

    #[test]
    fn non_beat_codes_are_filtered() {
        // NORMAL(1) and PVC(5) are beats; RHYTHM(28) and NOISE(14) are not.
        for (code, expected) in [(1u8, true), (5, true), (28, false), (14, false)] {
            let ann = WfdbAnnotation { sample: 0, code };
            assert_eq!(ann.is_beat(), expected, "code {}", code);
        }
    }
}
