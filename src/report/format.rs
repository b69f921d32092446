//! Formatted terminal output.
//!
//! Formatting lives in one place so the matching and fitting code stays free
//! of presentation concerns, and output changes are localized.

use crate::app::pipeline::RunOutput;
use crate::domain::{FitConfig, ResidueFit, RunWarning, SkippedResidue};
use crate::series::SpectrumMatches;

/// Format the run summary (inputs, matching statistics, fit settings).
pub fn format_run_summary(run: &RunOutput, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== csp - CSP titration analysis ===\n");
    out.push_str(&format!("Source: {}\n", run.source));

    let spectra = run.spectra();
    match (spectra.first(), spectra.last()) {
        (Some(first), Some(last)) if spectra.len() > 1 => {
            out.push_str(&format!("Spectra: n={} | {first} .. {last}\n", spectra.len()));
        }
        (Some(first), _) => out.push_str(&format!("Spectra: n=1 | {first}\n")),
        _ => out.push_str("Spectra: n=0\n"),
    }
    out.push_str(&format!(
        "Residues: tracked={} | curves={}\n",
        run.assembled.series.tracks.len(),
        run.curves.len()
    ));
    out.push_str(&format!(
        "Distance: sqrt((d1^2 + ({:.3}*d2)^2) / 2) | axes={:?}\n",
        config.shift_weight, config.axes
    ));

    if !run.assembled.matches.is_empty() {
        out.push_str("\nMatching:\n");
        out.push_str(&format_matching(&run.assembled.matches));
    }

    out.push_str(&format!(
        "\nFit: 1:1 isotherm | {} Ka starts in [{:.3e}, {:.3e}] | max_iter={} | min_points={}\n",
        config.ka_starts, config.ka_min, config.ka_max, config.max_iterations, config.min_points
    ));
    out.push_str(&format!(
        "Fitted: {} | skipped: {} | outliers: {}\n",
        run.batch.fits.len(),
        run.batch.skipped.len(),
        run.outliers()
    ));
    if let Some(b) = &run.bounds {
        out.push_str(&format!(
            "Ka IQR: Q1={:.4e} Q3={:.4e} | fences=[{:.4e}, {:.4e}] (k={})\n",
            b.q1, b.q3, b.lower, b.upper, config.iqr_factor
        ));
    }
    out.push('\n');

    out
}

fn format_matching(matches: &[SpectrumMatches]) -> String {
    let mut out = String::new();
    out.push_str(&header_line(&format!(
        "{:<16} {:>6} {:>6} {:>7} {:>9} {:>8}",
        "spectrum", "refs", "peaks", "unique", "conflicts", "matched"
    )));
    out.push_str(&header_line(&format!(
        "{:-<16} {:-<6} {:-<6} {:-<7} {:-<9} {:-<8}",
        "", "", "", "", "", ""
    )));
    for sm in matches {
        let s = &sm.outcome.summary;
        out.push_str(&header_line(&format!(
            "{:<16} {:>6} {:>6} {:>7} {:>9} {:>8}",
            truncate(&sm.spectrum, 16),
            s.references,
            s.unlabeled,
            s.unique_matches,
            s.conflicts,
            s.total_matches
        )));
    }
    out
}

/// Per-residue result table, in anchor order.
pub fn format_results(fits: &[ResidueFit]) -> String {
    let mut out = String::new();
    out.push_str("Binding constants:\n");
    if fits.is_empty() {
        out.push_str("  (no residue could be fitted)\n");
        return out;
    }

    out.push_str(&header_line(&format!(
        "{:<12} {:>12} {:>12} {:>10} {:>8} {:>4} {:<7}",
        "residue", "Ka (1/M)", "Kd (M)", "dHG", "R2", "n", "outlier"
    )));
    out.push_str(&header_line(&format!(
        "{:-<12} {:-<12} {:-<12} {:-<10} {:-<8} {:-<4} {:-<7}",
        "", "", "", "", "", "", ""
    )));
    for f in fits {
        out.push_str(&header_line(&format!(
            "{:<12} {:>12.4e} {:>12.4e} {:>10.4} {:>8.4} {:>4} {:<7}",
            truncate(&f.residue, 12),
            f.ka,
            f.kd(),
            f.delta_hg,
            f.r_squared,
            f.n_points,
            if f.is_outlier { "*" } else { "" }
        )));
    }
    out
}

/// Every conflict group: spectrum, contested peak, contenders and the winner.
pub fn format_conflicts(matches: &[SpectrumMatches]) -> String {
    let mut out = String::new();
    let total: usize = matches.iter().map(|m| m.outcome.conflicts.len()).sum();
    out.push_str(&format!("Matcher conflicts ({total}):\n"));

    for sm in matches {
        for group in &sm.outcome.conflicts {
            let peak = sm
                .peak_index(group.unlabeled)
                .map(|i| i.to_string())
                .unwrap_or_else(|| format!("col {}", group.unlabeled));
            let contenders: Vec<String> = group
                .contenders
                .iter()
                .map(|c| format!("{}={:.4}", c.label, c.distance))
                .collect();
            out.push_str(&format!(
                "  {} peak {peak}: {} contenders [{}] -> {}\n",
                sm.spectrum,
                group.size(),
                contenders.join(", "),
                group.winner
            ));
        }
    }
    out
}

pub fn format_skipped(skipped: &[SkippedResidue]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Skipped residues ({}):\n", skipped.len()));
    for s in skipped {
        out.push_str(&format!("  {}: {}\n", s.residue, s.reason));
    }
    out
}

pub fn format_warnings(warnings: &[RunWarning]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Warnings ({}):\n", warnings.len()));
    for w in warnings {
        out.push_str(&format!("  - {w}\n"));
    }
    out
}

fn header_line(s: &str) -> String {
    let mut line = s.trim_end().to_string();
    line.push('\n');
    line
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
