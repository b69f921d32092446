//! Peak-list text ingest.
//!
//! Format:
//! - line 1 is a free-text header and is skipped
//! - data lines have at least five whitespace-separated fields:
//!   `index coordA coordB <ignored> flag [...]`
//! - a line starting with `#` labels the data line directly before it
//!   (blank lines in between are allowed; the first such comment wins)
//!
//! Bad data lines are skipped and reported as `MalformedRecord` warnings; the
//! rest of the file is still used.

use std::path::Path;

use crate::domain::{AxisMapping, PeakRecord, RunWarning, Spectrum};
use crate::error::AppError;

const MIN_FIELDS: usize = 5;

/// Parser output: peaks in file order + per-line warnings.
#[derive(Debug, Clone)]
pub struct ParsedPeakList {
    pub header: String,
    pub peaks: Vec<PeakRecord>,
    pub warnings: Vec<RunWarning>,
}

/// Parse peak-list text. `source` is only used in warning messages.
pub fn parse_peak_list(source: &str, text: &str, axes: AxisMapping) -> ParsedPeakList {
    let mut lines = text.lines().enumerate();
    let header = lines
        .next()
        .map(|(_, l)| l.trim().to_string())
        .unwrap_or_default();

    let mut peaks: Vec<PeakRecord> = Vec::new();
    let mut warnings = Vec::new();
    // Index into `peaks` of a data line still waiting for its label comment.
    let mut pending: Option<usize> = None;

    for (idx, raw) in lines {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            let label = comment.trim();
            if let Some(i) = pending.take() {
                if !label.is_empty() {
                    peaks[i].label = Some(label.to_string());
                }
            }
            continue;
        }

        match parse_data_line(trimmed, axes) {
            Ok(mut peak) => {
                peak.raw_line = raw.to_string();
                peaks.push(peak);
                pending = Some(peaks.len() - 1);
            }
            Err(reason) => {
                let w = RunWarning::MalformedRecord {
                    source: source.to_string(),
                    line: line_no,
                    reason,
                };
                log::warn!("{w}");
                warnings.push(w);
                pending = None;
            }
        }
    }

    ParsedPeakList {
        header,
        peaks,
        warnings,
    }
}

/// Read and parse one peak-list file into a named spectrum.
pub fn read_peak_list(path: &Path, axes: AxisMapping) -> Result<(Spectrum, Vec<RunWarning>), AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::input(format!("Failed to read peak list '{}': {e}", path.display()))
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());

    let parsed = parse_peak_list(&path.display().to_string(), &text, axes);
    log::debug!(
        "{}: header '{}', {} peaks, {} skipped lines",
        path.display(),
        parsed.header,
        parsed.peaks.len(),
        parsed.warnings.len()
    );

    Ok((
        Spectrum {
            name,
            peaks: parsed.peaks,
        },
        parsed.warnings,
    ))
}

fn parse_data_line(line: &str, axes: AxisMapping) -> Result<PeakRecord, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(format!(
            "expected at least {MIN_FIELDS} fields, found {}",
            fields.len()
        ));
    }

    let index = fields[0]
        .parse::<i64>()
        .map_err(|_| format!("invalid peak index '{}'", fields[0]))?;
    let coord_a = parse_coord(fields[1])?;
    let coord_b = parse_coord(fields[2])?;
    let (coord1, coord2) = axes.apply(coord_a, coord_b);

    Ok(PeakRecord {
        index,
        coord1,
        coord2,
        flag: fields[4].to_string(),
        label: None,
        raw_line: String::new(),
    })
}

fn parse_coord(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid coordinate '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Peak list exported 2024-03-01
  1   8.312  121.40  1.0e5  0
# G12
  2   7.951  115.02  8.2e4  0

# K13
  3   9.004
  4   8.500  118.00  5.0e4  1
# S15
# ignored second comment
";

    #[test]
    fn parses_data_lines_and_attaches_labels() {
        let parsed = parse_peak_list("t0.list", SAMPLE, AxisMapping::Ab);
        assert_eq!(parsed.header, "Peak list exported 2024-03-01");
        assert_eq!(parsed.peaks.len(), 3);

        let p = &parsed.peaks[0];
        assert_eq!(p.index, 1);
        assert_eq!((p.coord1, p.coord2), (8.312, 121.40));
        assert_eq!(p.flag, "0");
        assert_eq!(p.label.as_deref(), Some("G12"));
        assert!(p.raw_line.contains("8.312"));

        // Blank line between data and comment is allowed.
        assert_eq!(parsed.peaks[1].label.as_deref(), Some("K13"));
        assert_eq!(parsed.peaks[2].label.as_deref(), Some("S15"));
    }

    #[test]
    fn short_lines_are_reported_and_skipped() {
        let parsed = parse_peak_list("t0.list", SAMPLE, AxisMapping::Ab);
        assert_eq!(parsed.warnings.len(), 1);
        match &parsed.warnings[0] {
            RunWarning::MalformedRecord { source, line, reason } => {
                assert_eq!(source, "t0.list");
                assert_eq!(*line, 7);
                assert!(reason.contains("found 2"));
            }
            other => panic!("unexpected warning: {other:?}"),
        }
    }

    #[test]
    fn comment_after_malformed_line_labels_nothing() {
        let text = "hdr\n1 1.0 2.0 x 0\nbad line\n# A\n";
        let parsed = parse_peak_list("x", text, AxisMapping::Ab);
        assert_eq!(parsed.peaks.len(), 1);
        assert_eq!(parsed.peaks[0].label, None);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn axis_mapping_is_applied() {
        let parsed = parse_peak_list("x", "hdr\n7 8.0 120.0 0 0\n", AxisMapping::Ba);
        assert_eq!((parsed.peaks[0].coord1, parsed.peaks[0].coord2), (120.0, 8.0));
    }

    #[test]
    fn non_numeric_fields_are_malformed() {
        let parsed = parse_peak_list("x", "hdr\nA 8.0 120.0 0 0\n1 8.0 nan 0 0\n", AxisMapping::Ab);
        assert!(parsed.peaks.is_empty());
        assert_eq!(parsed.warnings.len(), 2);
    }
}
