//! Residue tracking across a titration series.
//!
//! The first spectrum is the anchor: every labeled peak in it defines a residue
//! and its reference position. Each follow-up spectrum is resolved either by
//! label (when it carries labels) or by nearest-neighbour matching against the
//! anchor positions. Residues that cannot be located in a spectrum are recorded
//! as missing for that spectrum.
//!
//! The per-spectrum perturbation distance is
//!
//! ```text
//! d = sqrt((Δx² + (w·Δy)²) / 2)
//! ```
//!
//! where `w` down-weights the second dimension (typically the heteronucleus,
//! whose shifts are larger in ppm for the same structural change).

use std::collections::{HashMap, HashSet};

use crate::domain::{
    Concentrations, Coord, CspCurve, CspPoint, MatchOutcome, ResidueTrack, RunWarning, Spectrum,
    TitrationSeries,
};
use crate::error::{AppError, ErrorKind};
use crate::matching::{Reference, match_peaks};

/// Matcher output for one unlabeled follow-up spectrum.
#[derive(Debug, Clone)]
pub struct SpectrumMatches {
    pub spectrum: String,
    /// Position of the spectrum in the series (anchor = 0).
    pub position: usize,
    pub outcome: MatchOutcome,
    /// `PeakRecord::index` for each unlabeled column.
    pub peak_indices: Vec<i64>,
}

impl SpectrumMatches {
    pub fn peak_index(&self, column: usize) -> Option<i64> {
        self.peak_indices.get(column).copied()
    }
}

/// Output of [`assemble_series`].
#[derive(Debug, Clone, Default)]
pub struct AssembledSeries {
    pub series: TitrationSeries,
    pub matches: Vec<SpectrumMatches>,
    pub warnings: Vec<RunWarning>,
}

/// Weighted perturbation distance between an anchor position and a later one.
pub fn shift_distance(anchor: Coord, other: Coord, weight: f64) -> f64 {
    let dx = other.x - anchor.x;
    let dy = weight * (other.y - anchor.y);
    ((dx * dx + dy * dy) / 2.0).sqrt()
}

/// Track every anchor residue through the series.
pub fn assemble_series(spectra: &[Spectrum]) -> Result<AssembledSeries, AppError> {
    let Some((anchor, follow_ups)) = spectra.split_first() else {
        return Err(AppError::new(ErrorKind::Data, "No spectra to analyse."));
    };

    let mut warnings = Vec::new();
    let anchor_map = label_map(anchor, &mut warnings);
    if anchor_map.is_empty() {
        return Err(AppError::new(
            ErrorKind::Data,
            format!(
                "Anchor spectrum '{}' has no labeled peaks; nothing to track.",
                anchor.name
            ),
        ));
    }

    let references: Vec<Reference> = anchor_map
        .iter()
        .map(|(label, coord)| Reference::new(label.clone(), *coord))
        .collect();

    let n = spectra.len();
    let mut tracks: Vec<ResidueTrack> = references
        .iter()
        .map(|r| {
            let mut coords = vec![None; n];
            coords[0] = Some(r.coord);
            ResidueTrack {
                label: r.label.clone(),
                coords,
            }
        })
        .collect();

    let mut matches = Vec::new();

    for (offset, spectrum) in follow_ups.iter().enumerate() {
        let position = offset + 1;

        if spectrum.is_labeled() {
            let found: HashMap<String, Coord> =
                label_map(spectrum, &mut warnings).into_iter().collect();
            for track in tracks.iter_mut() {
                track.coords[position] = found.get(&track.label).copied();
            }
        } else {
            let unlabeled: Vec<Coord> = spectrum.peaks.iter().map(|p| p.coord()).collect();
            let outcome = match_peaks(&references, &unlabeled);
            log::info!(
                "{}: {} references, {} peaks, {} unique, {} conflicts, {} matched",
                spectrum.name,
                outcome.summary.references,
                outcome.summary.unlabeled,
                outcome.summary.unique_matches,
                outcome.summary.conflicts,
                outcome.summary.total_matches
            );

            let by_label: HashMap<&str, usize> = outcome
                .matches()
                .map(|m| (m.reference_label.as_str(), m.unlabeled))
                .collect();
            for track in tracks.iter_mut() {
                track.coords[position] = by_label
                    .get(track.label.as_str())
                    .map(|&col| unlabeled[col]);
            }

            matches.push(SpectrumMatches {
                spectrum: spectrum.name.clone(),
                position,
                peak_indices: spectrum.peaks.iter().map(|p| p.index).collect(),
                outcome,
            });
        }

        let missing = tracks.iter().filter(|t| t.coords[position].is_none()).count();
        if missing > 0 {
            log::debug!("{}: {missing} residue(s) not located", spectrum.name);
        }
    }

    Ok(AssembledSeries {
        series: TitrationSeries {
            spectra: spectra.iter().map(|s| s.name.clone()).collect(),
            tracks,
        },
        matches,
        warnings,
    })
}

/// Turn residue tracks into distance-vs-concentration curves.
///
/// Spectra and concentration arrays are truncated to the shortest of the three
/// lengths; a mismatch is reported as a warning, never as an error.
pub fn build_curves(
    series: &TitrationSeries,
    conc: &Concentrations,
    weight: f64,
) -> (Vec<CspCurve>, Option<RunWarning>) {
    let spectra = series.spectra.len();
    let used = spectra.min(conc.host.len()).min(conc.guest.len());

    let warning = if spectra != conc.host.len() || spectra != conc.guest.len() {
        let w = RunWarning::MismatchedSeriesLength {
            spectra,
            host: conc.host.len(),
            guest: conc.guest.len(),
            used,
        };
        log::warn!("{w}");
        Some(w)
    } else {
        None
    };

    let curves = series
        .tracks
        .iter()
        .filter_map(|track| {
            let anchor = track.coords.first().copied().flatten()?;
            let points = (0..used)
                .map(|i| CspPoint {
                    host: conc.host[i],
                    guest: conc.guest[i],
                    distance: if i == 0 {
                        Some(0.0)
                    } else {
                        track.coords[i].map(|c| shift_distance(anchor, c, weight))
                    },
                })
                .collect();
            Some(CspCurve {
                residue: track.label.clone(),
                points,
            })
        })
        .collect();

    (curves, warning)
}

/// Label -> position for one spectrum, first occurrence wins.
fn label_map(spectrum: &Spectrum, warnings: &mut Vec<RunWarning>) -> Vec<(String, Coord)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for peak in &spectrum.peaks {
        let Some(label) = peak.label.as_deref() else {
            continue;
        };
        if !seen.insert(label) {
            let w = RunWarning::DuplicateLabel {
                spectrum: spectrum.name.clone(),
                label: label.to_string(),
            };
            log::warn!("{w}");
            warnings.push(w);
            continue;
        }
        out.push((label.to_string(), peak.coord()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeakRecord;

    fn peak(index: i64, x: f64, y: f64, label: Option<&str>) -> PeakRecord {
        PeakRecord {
            index,
            coord1: x,
            coord2: y,
            flag: "0".to_string(),
            label: label.map(str::to_string),
            raw_line: String::new(),
        }
    }

    fn spectrum(name: &str, peaks: Vec<PeakRecord>) -> Spectrum {
        Spectrum {
            name: name.to_string(),
            peaks,
        }
    }

    #[test]
    fn weighted_distance_matches_worked_example() {
        let d = shift_distance(Coord::new(0.0, 0.0), Coord::new(3.0, 5.0), 0.2);
        assert!((d - 5.0_f64.sqrt()).abs() < 1e-12);
        assert!((d - 2.2361).abs() < 1e-4);
    }

    #[test]
    fn anchor_distance_is_exactly_zero() {
        let spectra = vec![
            spectrum("s0", vec![peak(1, 8.0, 120.0, Some("A")), peak(2, 7.5, 110.0, Some("B"))]),
            spectrum("s1", vec![peak(1, 8.1, 120.5, None), peak(2, 7.5, 110.0, None)]),
        ];
        let assembled = assemble_series(&spectra).unwrap();
        let conc = Concentrations {
            host: vec![1e-3, 1e-3],
            guest: vec![0.0, 1e-3],
        };
        let (curves, warning) = build_curves(&assembled.series, &conc, 0.2);
        assert!(warning.is_none());
        assert_eq!(curves.len(), 2);
        for c in &curves {
            assert_eq!(c.points[0].distance, Some(0.0));
        }
        assert_eq!(curves[1].points[1].distance, Some(0.0));
    }

    #[test]
    fn unlabeled_follow_up_uses_matcher_and_keeps_conflict_losers_missing() {
        let spectra = vec![
            spectrum("anchor", vec![
                peak(1, 0.0, 0.0, Some("A")),
                peak(2, 0.3, 0.0, Some("B")),
                peak(3, 5.0, 5.0, Some("C")),
            ]),
            spectrum("t1", vec![peak(10, 0.1, 0.0, None), peak(11, 5.0, 5.5, None)]),
        ];

        let assembled = assemble_series(&spectra).unwrap();
        let series = &assembled.series;
        assert_eq!(series.track("A").unwrap().coords[1], Some(Coord::new(0.1, 0.0)));
        assert_eq!(series.track("B").unwrap().coords[1], None);
        assert_eq!(series.track("C").unwrap().coords[1], Some(Coord::new(5.0, 5.5)));

        assert_eq!(assembled.matches.len(), 1);
        let m = &assembled.matches[0];
        assert_eq!(m.position, 1);
        assert_eq!(m.outcome.conflicts.len(), 1);
        assert_eq!(m.peak_index(m.outcome.conflicts[0].unlabeled), Some(10));
    }

    #[test]
    fn labeled_follow_up_is_resolved_by_label() {
        let spectra = vec![
            spectrum("anchor", vec![peak(1, 8.0, 120.0, Some("A")), peak(2, 7.0, 110.0, Some("B"))]),
            spectrum("t1", vec![peak(5, 7.0, 110.0, Some("A")), peak(6, 9.0, 99.0, Some("Z"))]),
        ];
        let assembled = assemble_series(&spectra).unwrap();
        assert_eq!(
            assembled.series.track("A").unwrap().coords[1],
            Some(Coord::new(7.0, 110.0))
        );
        assert_eq!(assembled.series.track("B").unwrap().coords[1], None);
        assert!(assembled.matches.is_empty());
    }

    #[test]
    fn missing_coordinates_give_missing_distance() {
        let series = TitrationSeries {
            spectra: vec!["a".into(), "b".into(), "c".into()],
            tracks: vec![ResidueTrack {
                label: "R9".into(),
                coords: vec![Some(Coord::new(1.0, 1.0)), None, Some(Coord::new(1.0, 1.0))],
            }],
        };
        let conc = Concentrations {
            host: vec![1.0; 3],
            guest: vec![0.0, 1.0, 2.0],
        };
        let (curves, _) = build_curves(&series, &conc, 0.2);
        assert_eq!(curves[0].points[1].distance, None);
        assert_eq!(curves[0].points[2].distance, Some(0.0));
    }

    #[test]
    fn length_mismatch_truncates_and_warns() {
        let series = TitrationSeries {
            spectra: vec!["a".into(), "b".into(), "c".into()],
            tracks: vec![ResidueTrack {
                label: "R1".into(),
                coords: vec![Some(Coord::new(0.0, 0.0)); 3],
            }],
        };
        let conc = Concentrations {
            host: vec![1.0; 4],
            guest: vec![0.0, 1.0],
        };
        let (curves, warning) = build_curves(&series, &conc, 0.2);
        assert_eq!(curves[0].points.len(), 2);
        assert_eq!(
            warning,
            Some(RunWarning::MismatchedSeriesLength {
                spectra: 3,
                host: 4,
                guest: 2,
                used: 2,
            })
        );
    }

    #[test]
    fn duplicate_anchor_labels_keep_first_and_warn() {
        let spectra = vec![spectrum("anchor", vec![
            peak(1, 1.0, 1.0, Some("A")),
            peak(2, 2.0, 2.0, Some("A")),
        ])];
        let assembled = assemble_series(&spectra).unwrap();
        assert_eq!(assembled.series.tracks.len(), 1);
        assert_eq!(assembled.series.tracks[0].coords[0], Some(Coord::new(1.0, 1.0)));
        assert_eq!(assembled.warnings.len(), 1);
    }

    #[test]
    fn empty_or_unlabeled_anchor_is_a_data_error() {
        assert_eq!(assemble_series(&[]).unwrap_err().kind(), ErrorKind::Data);
        let spectra = vec![spectrum("anchor", vec![peak(1, 1.0, 1.0, None)])];
        assert_eq!(assemble_series(&spectra).unwrap_err().kind(), ErrorKind::Data);
    }
}
