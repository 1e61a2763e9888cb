//! Check-before-save duplicate detection on top of the ranker.

use crate::errors::AppError;
use crate::lead_storage::{LeadScope, LeadStorage};
use crate::models::{
    DetectionOptions, DuplicateCandidate, DuplicateCheckInput, DuplicateCheckResponse, ExistingLead,
};
use crate::ranker::{DuplicateRanker, PreparedLeadSet};
use rayon::prelude::*;

/// Rank `input` against `existing` and apply the request options.
///
/// `min_score` below the ranker's detection threshold is raised to it, so the
/// options can only narrow the result.
pub fn detect_duplicates(
    ranker: &DuplicateRanker,
    input: &DuplicateCheckInput,
    existing: &[ExistingLead],
    options: &DetectionOptions,
    default_max_results: usize,
) -> DuplicateCheckResponse {
    let min_score = options
        .min_score
        .filter(|score| score.is_finite())
        .map_or(ranker.detection_threshold(), |score| {
            score.max(ranker.detection_threshold())
        });
    let max_results = options.max_results.unwrap_or(default_max_results);

    let exclude = options.exclude_lead_id.as_deref();

    let duplicates: Vec<_> = ranker
        .rank(input, existing)
        .into_iter()
        .filter(|candidate| Some(candidate.lead_id()) != exclude)
        .filter(|candidate| candidate.score() >= min_score)
        .take(max_results)
        .collect();

    tracing::debug!(
        legal_name = %input.legal_name,
        compared = existing.len(),
        found = duplicates.len(),
        min_score,
        "Duplicate check finished"
    );

    DuplicateCheckResponse::new(duplicates, existing.len())
}

/// Check `input` against the stored leads selected by `options`.
///
/// The set is reloaded unless `options.cached` is set; the excluded lead is
/// filtered after loading, so edit-mode checks share one cached set.
pub async fn check_against_storage(
    storage: &LeadStorage,
    ranker: &DuplicateRanker,
    input: &DuplicateCheckInput,
    options: &DetectionOptions,
    default_max_results: usize,
) -> Result<DuplicateCheckResponse, AppError> {
    let scope = LeadScope::new(options.include_qualified);
    let existing = storage.existing_leads(scope, !options.cached).await?;

    Ok(detect_duplicates(
        ranker,
        input,
        &existing,
        options,
        default_max_results,
    ))
}

/// Two stored leads that look like the same company.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePair {
    pub lead_id: String,
    pub legal_name: String,
    pub candidate: DuplicateCandidate,
}

/// Every pair of `leads` scoring at least `min_score`, best first.
///
/// Each lead is ranked against the whole set; a pair is reported once, from
/// the side with the smaller id, and a lead is never paired with itself.
pub fn find_duplicate_pairs(
    ranker: &DuplicateRanker,
    leads: &[ExistingLead],
    min_score: f64,
) -> Vec<DuplicatePair> {
    let prepared = PreparedLeadSet::new(leads);

    let mut pairs: Vec<DuplicatePair> = prepared
        .iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .flat_map_iter(|(lead, normalized)| {
            ranker
                .rank_prepared(normalized, &prepared)
                .into_iter()
                .filter(move |candidate| {
                    candidate.lead_id() > lead.id.as_str() && candidate.score() >= min_score
                })
                .map(move |candidate| DuplicatePair {
                    lead_id: lead.id.clone(),
                    legal_name: lead.legal_name.clone(),
                    candidate,
                })
        })
        .collect();

    pairs.sort_by(|a, b| b.candidate.score().total_cmp(&a.candidate.score()));
    pairs
}
