//! Nearest-neighbour peak assignment with conflict resolution.
//!
//! Given labeled reference peaks `R` and unlabeled peaks `U`:
//!
//! 1. build the dense `|R| × |U|` Euclidean distance matrix
//! 2. every reference picks its nearest column (ties: lowest column)
//! 3. columns picked by two or more references form conflict groups
//! 4. inside a group the smallest distance wins (ties: earliest reference);
//!    the other contenders are dropped from the final set and are *not*
//!    reassigned to their next-best column
//!
//! The pass is deterministic and never retries.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::domain::{ConflictGroup, Contender, Coord, MatchOutcome, MatchSummary, ResolvedMatch};

/// A labeled peak used as a matching key.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub label: String,
    pub coord: Coord,
}

impl Reference {
    pub fn new(label: impl Into<String>, coord: Coord) -> Self {
        Self {
            label: label.into(),
            coord,
        }
    }
}

/// Distances between references (rows) and unlabeled peaks (columns).
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    data: DMatrix<f64>,
}

impl DistanceMatrix {
    pub fn build(references: &[Reference], unlabeled: &[Coord]) -> Self {
        let data = DMatrix::from_fn(references.len(), unlabeled.len(), |r, u| {
            references[r].coord.euclidean(unlabeled[u])
        });
        Self {
            labels: references.iter().map(|r| r.label.clone()).collect(),
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn label(&self, row: usize) -> &str {
        &self.labels[row]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Nearest column for `row`; the first column wins ties.
    pub fn nearest(&self, row: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for col in 0..self.cols() {
            let d = self.get(row, col);
            if !d.is_finite() {
                continue;
            }
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((col, d)),
            }
        }
        best
    }
}

/// Assign unlabeled peaks to references.
pub fn match_peaks(references: &[Reference], unlabeled: &[Coord]) -> MatchOutcome {
    let matrix = DistanceMatrix::build(references, unlabeled);

    // column -> [(row, distance)] in reference order
    let mut claims: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
    let mut choice: Vec<Option<(usize, f64)>> = Vec::with_capacity(matrix.rows());
    for row in 0..matrix.rows() {
        let nearest = matrix.nearest(row);
        if let Some((col, d)) = nearest {
            claims.entry(col).or_default().push((row, d));
        }
        choice.push(nearest);
    }

    let mut unconflicted = Vec::new();
    for (row, nearest) in choice.iter().enumerate() {
        let Some((col, d)) = *nearest else { continue };
        if claims.get(&col).map(Vec::len) == Some(1) {
            unconflicted.push(ResolvedMatch {
                reference_label: matrix.label(row).to_string(),
                unlabeled: col,
                distance: d,
            });
        }
    }

    let mut resolved = Vec::new();
    let mut conflicts = Vec::new();
    for (&col, rows) in claims.iter().filter(|(_, rows)| rows.len() > 1) {
        let Some(&(win_row, win_d)) = rows
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        else {
            continue;
        };

        let winner = matrix.label(win_row).to_string();
        log::debug!(
            "conflict on peak #{col}: {} contenders, '{winner}' kept (d={win_d:.4})",
            rows.len()
        );

        resolved.push(ResolvedMatch {
            reference_label: winner.clone(),
            unlabeled: col,
            distance: win_d,
        });
        conflicts.push(ConflictGroup {
            unlabeled: col,
            contenders: rows
                .iter()
                .map(|&(row, distance)| Contender {
                    label: matrix.label(row).to_string(),
                    distance,
                })
                .collect(),
            winner,
        });
    }

    let summary = MatchSummary {
        references: references.len(),
        unlabeled: unlabeled.len(),
        unique_matches: unconflicted.len(),
        conflicts: conflicts.len(),
        total_matches: unconflicted.len() + resolved.len(),
    };

    MatchOutcome {
        unconflicted,
        resolved,
        conflicts,
        summary,
    }
}
