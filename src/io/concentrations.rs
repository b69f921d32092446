//! Host/guest concentration input.
//!
//! Concentrations are positional: entry `i` belongs to spectrum `i` of the
//! series. They come either as inline comma lists (`--host`, `--guest`) or as a
//! CSV file with `host` and `guest` columns. Since positions matter, a bad CSV
//! row aborts the run instead of being skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Concentrations;
use crate::error::AppError;

const HOST_COLUMNS: &[&str] = &["host", "h0", "host_conc"];
const GUEST_COLUMNS: &[&str] = &["guest", "g0", "guest_conc", "ligand"];

/// Parse a comma/whitespace separated list of concentrations.
pub fn parse_concentration_list(what: &str, text: &str) -> Result<Vec<f64>, AppError> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| parse_value(what, s))
        .collect()
}

/// Build concentrations from already-split inline values.
pub fn concentrations_from_lists(host: &[f64], guest: &[f64]) -> Result<Concentrations, AppError> {
    for (what, values) in [("host", host), ("guest", guest)] {
        if values.is_empty() {
            return Err(AppError::input(format!("No {what} concentrations given.")));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(AppError::input(format!(
                "Invalid {what} concentration {v}: expected a finite value >= 0."
            )));
        }
    }
    Ok(Concentrations {
        host: host.to_vec(),
        guest: guest.to_vec(),
    })
}

/// Read concentrations from a CSV file.
pub fn read_concentrations_csv(path: &Path) -> Result<Concentrations, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!(
            "Failed to open concentrations CSV '{}': {e}",
            path.display()
        ))
    })?;
    parse_concentrations_csv(file)
}

/// Parse concentrations CSV from any reader.
pub fn parse_concentrations_csv<R: Read>(reader: R) -> Result<Concentrations, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read concentrations CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let host_col = find_column(&header_map, HOST_COLUMNS)
        .ok_or_else(|| AppError::input("Missing required concentrations column: `host`"))?;
    let guest_col = find_column(&header_map, GUEST_COLUMNS)
        .ok_or_else(|| AppError::input("Missing required concentrations column: `guest`"))?;

    let mut host = Vec::new();
    let mut guest = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::input(format!("Concentrations CSV: {e}")))?;
        let line = record.position().map_or(0, |p| p.line());
        let h = record
            .get(host_col)
            .ok_or_else(|| AppError::input(format!("Concentrations CSV line {line}: missing host")))?;
        let g = record
            .get(guest_col)
            .ok_or_else(|| AppError::input(format!("Concentrations CSV line {line}: missing guest")))?;
        host.push(parse_value("host", h).map_err(|e| prefix_line(line, e))?);
        guest.push(parse_value("guest", g).map_err(|e| prefix_line(line, e))?);
    }

    concentrations_from_lists(&host, &guest)
}

fn parse_value(what: &str, s: &str) -> Result<f64, AppError> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(AppError::input(format!(
            "Invalid {what} concentration '{s}': expected a finite value >= 0."
        ))),
    }
}

fn prefix_line(line: u64, err: AppError) -> AppError {
    AppError::input(format!("Concentrations CSV line {line}: {err}"))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| header_map.get(*n).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn inline_lists_accept_commas_and_spaces() {
        let v = parse_concentration_list("guest", "0, 1e-3,2e-3 3e-3").unwrap();
        assert_eq!(v, vec![0.0, 1e-3, 2e-3, 3e-3]);
    }

    #[test]
    fn negative_inline_value_is_rejected() {
        let err = parse_concentration_list("host", "1e-3,-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn csv_with_bom_and_aliases() {
        let text = "\u{feff}H0,G0\n5e-4,0\n5e-4,1e-3\n# trailing note\n";
        let c = parse_concentrations_csv(text.as_bytes()).unwrap();
        assert_eq!(c.host, vec![5e-4, 5e-4]);
        assert_eq!(c.guest, vec![0.0, 1e-3]);
    }

    #[test]
    fn csv_missing_column_is_an_input_error() {
        let err = parse_concentrations_csv("host,other\n1,2\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("guest"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn csv_bad_row_reports_line() {
        let err = parse_concentrations_csv("host,guest\n1,2\n1,abc\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn csv_line_numbers_count_comment_lines() {
        let text = "host,guest\n# first point\n1e-3,0\n# second point\n1e-3,oops\n";
        let err = parse_concentrations_csv(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 5"), "{err}");
    }

    #[test]
    fn empty_lists_are_rejected() {
        assert!(concentrations_from_lists(&[], &[1.0]).is_err());
    }
}
