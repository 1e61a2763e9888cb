//! Combines field scores into ranked, classified duplicate candidates.

use crate::field_matcher::FieldMatcher;
use crate::models::{
    total_score, DuplicateCandidate, DuplicateCheckInput, ExistingLead, MatchSeverity,
};
use crate::normalizer::NormalizedLead;

/// Candidates below this score are not worth surfacing.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 40.0;

/// Score boundaries of the severity tiers. Everything at or above the
/// detection threshold and below `medium` is `Low`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityTable {
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self {
            high: 80.0,
            medium: 60.0,
        }
    }
}

impl SeverityTable {
    pub fn classify(&self, score: f64) -> MatchSeverity {
        if score >= self.high {
            MatchSeverity::High
        } else if score >= self.medium {
            MatchSeverity::Medium
        } else {
            MatchSeverity::Low
        }
    }
}

/// Existing leads paired with their normalized form, so a set can be
/// normalized once and compared against many candidates.
#[derive(Debug, Clone)]
pub struct PreparedLeadSet<'a> {
    entries: Vec<(&'a ExistingLead, NormalizedLead)>,
}

impl<'a> PreparedLeadSet<'a> {
    pub fn new(leads: &'a [ExistingLead]) -> Self {
        Self {
            entries: leads
                .iter()
                .map(|lead| (lead, NormalizedLead::from_existing(lead)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a ExistingLead, &NormalizedLead)> + '_ {
        self.entries.iter().map(|(lead, normalized)| (*lead, normalized))
    }
}

/// Scores a candidate against a set of existing leads and returns the likely
/// duplicates, best first.
#[derive(Debug, Clone)]
pub struct DuplicateRanker {
    matcher: FieldMatcher,
    detection_threshold: f64,
    severity: SeverityTable,
}

impl Default for DuplicateRanker {
    fn default() -> Self {
        Self::new(
            FieldMatcher::default(),
            DEFAULT_DETECTION_THRESHOLD,
            SeverityTable::default(),
        )
    }
}

impl DuplicateRanker {
    pub fn new(matcher: FieldMatcher, detection_threshold: f64, severity: SeverityTable) -> Self {
        Self {
            matcher,
            detection_threshold,
            severity,
        }
    }

    /// Default field rules with custom thresholds.
    pub fn with_thresholds(detection_threshold: f64, severity: SeverityTable) -> Self {
        Self::new(FieldMatcher::default(), detection_threshold, severity)
    }

    pub fn matcher(&self) -> &FieldMatcher {
        &self.matcher
    }

    pub fn detection_threshold(&self) -> f64 {
        self.detection_threshold
    }

    pub fn severity(&self) -> &SeverityTable {
        &self.severity
    }

    /// Rank `existing` against `input`.
    ///
    /// Candidates scoring below the detection threshold are dropped; the rest
    /// are sorted by score, descending. Equal scores keep the order in which
    /// the existing leads were supplied.
    pub fn rank(
        &self,
        input: &DuplicateCheckInput,
        existing: &[ExistingLead],
    ) -> Vec<DuplicateCandidate> {
        let prepared = PreparedLeadSet::new(existing);
        self.rank_prepared(&NormalizedLead::from_input(input), &prepared)
    }

    /// Same as [`rank`](Self::rank) over a set normalized up front.
    pub fn rank_prepared(
        &self,
        input: &NormalizedLead,
        existing: &PreparedLeadSet<'_>,
    ) -> Vec<DuplicateCandidate> {
        let mut candidates: Vec<DuplicateCandidate> = existing
            .iter()
            .filter_map(|(lead, normalized)| self.evaluate(input, lead, normalized))
            .collect();

        // sort_by is stable
        candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

        tracing::trace!(
            compared = existing.len(),
            matched = candidates.len(),
            "Ranked duplicate candidates"
        );

        candidates
    }

    /// Score a single pair; `None` when it falls below the detection threshold.
    pub fn evaluate(
        &self,
        input: &NormalizedLead,
        lead: &ExistingLead,
        normalized: &NormalizedLead,
    ) -> Option<DuplicateCandidate> {
        let field_scores = self.matcher.match_pair(input, normalized);
        if total_score(&field_scores) < self.detection_threshold {
            return None;
        }

        Some(DuplicateCandidate::new(
            lead.id.clone(),
            lead.legal_name.clone(),
            field_scores,
            |score| self.severity.classify(score),
        ))
    }
}
