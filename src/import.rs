//! Conflict check for spreadsheet imports.
//!
//! The existing set is normalized once; rows are then scored in parallel,
//! each row against the whole set. Results come back in input order.

use crate::models::{
    ExistingLead, ImportDuplicateReport, ImportRowInput, ImportRowResult, ImportRowStatus,
};
use crate::normalizer::NormalizedLead;
use crate::ranker::{DuplicateRanker, PreparedLeadSet};
use rayon::prelude::*;

/// When an import row counts as a conflict, and how much of it to report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportSettings {
    pub conflict_score: f64,
    pub max_matches: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            conflict_score: 70.0,
            max_matches: 3,
        }
    }
}

pub fn check_import_rows(
    ranker: &DuplicateRanker,
    rows: &[ImportRowInput],
    existing: &[ExistingLead],
    settings: ImportSettings,
) -> ImportDuplicateReport {
    let prepared = PreparedLeadSet::new(existing);

    let results: Vec<ImportRowResult> = rows
        .par_iter()
        .map(|row| check_row(ranker, row, &prepared, settings))
        .collect();

    let report = ImportDuplicateReport::from_rows(results);
    tracing::info!(
        total = report.total,
        duplicates = report.duplicates,
        invalid = report.invalid,
        compared = prepared.len(),
        "Import conflict check finished"
    );
    report
}

fn check_row(
    ranker: &DuplicateRanker,
    row: &ImportRowInput,
    prepared: &PreparedLeadSet<'_>,
    settings: ImportSettings,
) -> ImportRowResult {
    let Some(input) = row.to_check_input() else {
        return ImportRowResult {
            row_number: row.row_number,
            status: ImportRowStatus::Invalid,
            duplicates: Vec::new(),
            error: Some("Razão Social é obrigatória".to_string()),
        };
    };

    let mut candidates = ranker.rank_prepared(&NormalizedLead::from_input(&input), prepared);
    let is_conflict = candidates
        .first()
        .is_some_and(|best| best.score() >= settings.conflict_score);

    if !is_conflict {
        return ImportRowResult {
            row_number: row.row_number,
            status: ImportRowStatus::Clean,
            duplicates: Vec::new(),
            error: None,
        };
    }

    candidates.truncate(settings.max_matches);
    ImportRowResult {
        row_number: row.row_number,
        status: ImportRowStatus::Duplicate,
        duplicates: candidates,
        error: None,
    }
}
