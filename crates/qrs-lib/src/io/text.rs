use anyhow::{Context, Result};
use std::path::Path;

fn value_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, token)| !token.is_empty() && !token.starts_with('#'))
}

/// Parse newline-delimited samples; blank lines and `#` comments are skipped.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (line_no, token) in value_lines(text) {
        let val: f64 = token
            .parse()
            .with_context(|| format!("line {line_no} is not a sample value: {token}"))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a newline-delimited sample series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

/// Parse newline-delimited peak/annotation sample indices.
pub fn parse_event_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (line_no, token) in value_lines(text) {
        let val: usize = token
            .parse()
            .with_context(|| format!("line {line_no} is not a sample index: {token}"))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no annotation indices found");
    }
    Ok(out)
}

/// Read event indices from a file.
pub fn read_event_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_event_indices(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_samples_skipping_comments() {
        let text = "# header\n0.5\n\n-1.25\n 2.0 \n";
        assert_eq!(parse_f64_series(text).unwrap(), vec![0.5, -1.25, 2.0]);
    }

    #[test]
    fn reports_offending_line() {
        let err = parse_f64_series("1.0\nnot-a-number\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_f64_series("# only comments\n").is_err());
        assert!(parse_event_indices("").is_err());
    }

    #[test]
    fn parses_indices() {
        assert_eq!(
            parse_event_indices("3\n9\n120\n").unwrap(),
            vec![3, 9, 120]
        );
    }
}
