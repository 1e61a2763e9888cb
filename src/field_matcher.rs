//! Per-field comparison rules and weight redistribution.
//!
//! Scoring a pair runs in three explicit steps:
//! 1. [`FieldMatcher::comparable_fields`] picks the fields both sides can be
//!    compared on (legal name always, the rest only when present on both).
//! 2. [`WeightTable::renormalize`] rescales the weights of that subset to 100.
//! 3. Each comparable field is scored (exact or fuzzy) and weighted.
//!
//! A lead that leaves optional fields blank is therefore never penalized
//! against one that fills them in.

use crate::models::{FieldScore, LeadField};
use crate::normalizer::NormalizedLead;
use crate::similarity::similarity;
use std::collections::HashSet;

/// Free-mail providers: a shared domain here says nothing about the company.
pub const FREE_EMAIL_DOMAINS: [&str; 10] = [
    "gmail.com",
    "hotmail.com",
    "outlook.com",
    "yahoo.com",
    "icloud.com",
    "live.com",
    "msn.com",
    "uol.com.br",
    "bol.com.br",
    "terra.com.br",
];

/// How a field's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// 1 when equal, else 0.
    Exact,
    /// Edit-distance similarity.
    Fuzzy,
}

impl Comparison {
    pub fn of(field: LeadField) -> Self {
        match field {
            LeadField::LegalName | LeadField::TradeName => Comparison::Fuzzy,
            LeadField::Cnpj | LeadField::EmailDomain | LeadField::WebsiteDomain => {
                Comparison::Exact
            }
        }
    }

    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            Comparison::Exact => {
                if !a.is_empty() && a == b {
                    1.0
                } else {
                    0.0
                }
            }
            Comparison::Fuzzy => similarity(a, b),
        }
    }
}

/// Base weight of every scored field, in percent of a fully populated pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    pub legal_name: f64,
    pub cnpj: f64,
    pub trade_name: f64,
    pub email_domain: f64,
    pub website_domain: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            legal_name: 40.0,
            cnpj: 35.0,
            trade_name: 10.0,
            email_domain: 10.0,
            website_domain: 5.0,
        }
    }
}

impl WeightTable {
    pub fn weight(&self, field: LeadField) -> f64 {
        match field {
            LeadField::LegalName => self.legal_name,
            LeadField::Cnpj => self.cnpj,
            LeadField::TradeName => self.trade_name,
            LeadField::EmailDomain => self.email_domain,
            LeadField::WebsiteDomain => self.website_domain,
        }
    }

    /// Weights of `fields` rescaled proportionally so they sum to 100.
    ///
    /// Returns zero weights when the subset carries no weight at all.
    pub fn renormalize(&self, fields: &[LeadField]) -> Vec<(LeadField, f64)> {
        let total: f64 = fields.iter().map(|f| self.weight(*f).max(0.0)).sum();
        fields
            .iter()
            .map(|f| {
                let weight = if total > 0.0 {
                    self.weight(*f).max(0.0) * 100.0 / total
                } else {
                    0.0
                };
                (*f, weight)
            })
            .collect()
    }
}

/// A field both sides hold a comparable value for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparablePair<'a> {
    pub field: LeadField,
    pub input: &'a str,
    pub existing: &'a str,
}

/// Applies the per-field rules to a normalized pair.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    weights: WeightTable,
    ignored_email_domains: HashSet<String>,
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self::new(
            WeightTable::default(),
            FREE_EMAIL_DOMAINS.iter().map(|d| d.to_string()),
        )
    }
}

impl FieldMatcher {
    pub fn new(
        weights: WeightTable,
        ignored_email_domains: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            weights,
            ignored_email_domains: ignored_email_domains.into_iter().collect(),
        }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Whether an email domain belongs to a free-mail provider.
    pub fn is_ignored_email_domain(&self, domain: &str) -> bool {
        self.ignored_email_domains.contains(domain)
    }

    /// Fields both leads can be compared on. Legal name is always first.
    pub fn comparable_fields<'a>(
        &self,
        input: &'a NormalizedLead,
        existing: &'a NormalizedLead,
    ) -> Vec<ComparablePair<'a>> {
        let mut pairs = Vec::with_capacity(LeadField::ALL.len());
        pairs.push(ComparablePair {
            field: LeadField::LegalName,
            input: &input.legal_name,
            existing: &existing.legal_name,
        });

        if let (Some(a), Some(b)) = (&input.cnpj, &existing.cnpj) {
            pairs.push(ComparablePair {
                field: LeadField::Cnpj,
                input: a.as_str(),
                existing: b.as_str(),
            });
        }

        if let (Some(a), Some(b)) = (&input.trade_name, &existing.trade_name) {
            pairs.push(ComparablePair {
                field: LeadField::TradeName,
                input: a,
                existing: b,
            });
        }

        if let (Some(a), Some(b)) = (&input.email_domain, &existing.email_domain) {
            if !self.is_ignored_email_domain(a) && !self.is_ignored_email_domain(b) {
                pairs.push(ComparablePair {
                    field: LeadField::EmailDomain,
                    input: a,
                    existing: b,
                });
            }
        }

        if let (Some(a), Some(b)) = (&input.website_domain, &existing.website_domain) {
            pairs.push(ComparablePair {
                field: LeadField::WebsiteDomain,
                input: a,
                existing: b,
            });
        }

        pairs
    }

    /// Per-field scores for a pair, weights already redistributed over the
    /// comparable subset.
    pub fn match_pair(
        &self,
        input: &NormalizedLead,
        existing: &NormalizedLead,
    ) -> Vec<FieldScore> {
        let pairs = self.comparable_fields(input, existing);
        let fields: Vec<LeadField> = pairs.iter().map(|p| p.field).collect();
        let weights = self.weights.renormalize(&fields);

        pairs
            .iter()
            .zip(weights)
            .map(|(pair, (field, weight))| {
                let similarity = Comparison::of(field).score(pair.input, pair.existing);
                FieldScore::new(field, similarity, weight, pair.input, pair.existing)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DuplicateCheckInput, ExistingLead};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn normalized_input(input: DuplicateCheckInput) -> NormalizedLead {
        NormalizedLead::from_input(&input)
    }

    fn normalized_existing(lead: ExistingLead) -> NormalizedLead {
        NormalizedLead::from_existing(&lead)
    }

    fn fields_of(pairs: &[ComparablePair<'_>]) -> Vec<LeadField> {
        pairs.iter().map(|p| p.field).collect()
    }

    #[test]
    fn test_default_weights_sum_to_100() {
        let table = WeightTable::default();
        let total: f64 = LeadField::ALL.iter().map(|f| table.weight(*f)).sum();
        assert!(approx(total, 100.0));
    }

    #[test]
    fn test_renormalize_full_set_is_identity() {
        let table = WeightTable::default();
        let weights = table.renormalize(&LeadField::ALL);
        for (field, weight) in weights {
            assert!(approx(weight, table.weight(field)));
        }
    }

    #[test]
    fn test_renormalize_subset() {
        let table = WeightTable::default();
        let weights = table.renormalize(&[LeadField::LegalName, LeadField::Cnpj]);
        assert_eq!(weights.len(), 2);
        assert!(approx(weights[0].1, 40.0 * 100.0 / 75.0));
        assert!(approx(weights[1].1, 35.0 * 100.0 / 75.0));
        assert!(approx(weights[0].1 + weights[1].1, 100.0));
    }

    #[test]
    fn test_renormalize_legal_name_only() {
        let weights = WeightTable::default().renormalize(&[LeadField::LegalName]);
        assert_eq!(weights, vec![(LeadField::LegalName, 100.0)]);
    }

    #[test]
    fn test_renormalize_zero_weights() {
        let table = WeightTable {
            legal_name: 0.0,
            cnpj: 0.0,
            trade_name: 0.0,
            email_domain: 0.0,
            website_domain: 0.0,
        };
        let weights = table.renormalize(&[LeadField::LegalName]);
        assert_eq!(weights, vec![(LeadField::LegalName, 0.0)]);
    }

    #[test]
    fn test_comparison_kinds() {
        assert_eq!(Comparison::of(LeadField::LegalName), Comparison::Fuzzy);
        assert_eq!(Comparison::of(LeadField::TradeName), Comparison::Fuzzy);
        assert_eq!(Comparison::of(LeadField::Cnpj), Comparison::Exact);
        assert_eq!(Comparison::of(LeadField::EmailDomain), Comparison::Exact);
        assert_eq!(Comparison::of(LeadField::WebsiteDomain), Comparison::Exact);
    }

    #[test]
    fn test_exact_comparison() {
        assert_eq!(Comparison::Exact.score("acme.com", "acme.com"), 1.0);
        assert_eq!(Comparison::Exact.score("acme.com", "acme.com.br"), 0.0);
        assert_eq!(Comparison::Exact.score("", ""), 0.0);
    }

    #[test]
    fn test_only_legal_name_comparable_when_optionals_absent() {
        let matcher = FieldMatcher::default();
        let input = normalized_input(DuplicateCheckInput::new("Acme Realty"));
        let existing = normalized_existing(
            ExistingLead::new("1", "Acme Realty").with_cnpj("12345678000190"),
        );

        let pairs = matcher.comparable_fields(&input, &existing);
        assert_eq!(fields_of(&pairs), vec![LeadField::LegalName]);
    }

    #[test]
    fn test_all_fields_comparable() {
        let matcher = FieldMatcher::default();
        let input = normalized_input(
            DuplicateCheckInput::new("Acme Realty")
                .with_cnpj("12.345.678/0001-90")
                .with_trade_name("Acme")
                .with_email("joao@acme.com.br")
                .with_website("https://acme.com.br"),
        );
        let existing = normalized_existing(
            ExistingLead::new("1", "Acme Realty LTDA")
                .with_cnpj("12345678000190")
                .with_trade_name("Acme Imóveis")
                .with_email("maria@acme.com.br")
                .with_website("www.acme.com.br"),
        );

        let pairs = matcher.comparable_fields(&input, &existing);
        assert_eq!(fields_of(&pairs), LeadField::ALL.to_vec());
    }

    #[test]
    fn test_invalid_cnpj_is_not_comparable() {
        let matcher = FieldMatcher::default();
        let input = normalized_input(DuplicateCheckInput::new("Acme").with_cnpj("12.345"));
        let existing = normalized_existing(ExistingLead::new("1", "Acme").with_cnpj("12.345"));

        let pairs = matcher.comparable_fields(&input, &existing);
        assert_eq!(fields_of(&pairs), vec![LeadField::LegalName]);
    }

    #[test]
    fn test_free_email_domains_are_not_comparable() {
        let matcher = FieldMatcher::default();
        let input = normalized_input(DuplicateCheckInput::new("Acme").with_email("a@gmail.com"));
        let existing =
            normalized_existing(ExistingLead::new("1", "Beta").with_email("b@gmail.com"));

        let pairs = matcher.comparable_fields(&input, &existing);
        assert_eq!(fields_of(&pairs), vec![LeadField::LegalName]);
        assert!(matcher.is_ignored_email_domain("gmail.com"));
        assert!(!matcher.is_ignored_email_domain("acme.com.br"));
    }

    #[test]
    fn test_custom_ignored_domains() {
        let matcher = FieldMatcher::new(WeightTable::default(), Vec::new());
        let input = normalized_input(DuplicateCheckInput::new("Acme").with_email("a@gmail.com"));
        let existing =
            normalized_existing(ExistingLead::new("1", "Acme").with_email("b@gmail.com"));

        let pairs = matcher.comparable_fields(&input, &existing);
        assert_eq!(
            fields_of(&pairs),
            vec![LeadField::LegalName, LeadField::EmailDomain]
        );
    }

    #[test]
    fn test_match_pair_cnpj_and_name() {
        let matcher = FieldMatcher::default();
        let input = normalized_input(
            DuplicateCheckInput::new("Acme Realty").with_cnpj("12.345.678/0001-90"),
        );
        let existing = normalized_existing(
            ExistingLead::new("1", "ACME Realty LTDA").with_cnpj("12345678000190"),
        );

        let scores = matcher.match_pair(&input, &existing);
        assert_eq!(scores.len(), 2);

        let name = &scores[0];
        assert_eq!(name.field(), LeadField::LegalName);
        assert!(approx(name.similarity(), 0.6875));
        assert!(approx(name.weight(), 4000.0 / 75.0));
        assert_eq!(name.input_value(), "acme realty");
        assert_eq!(name.matched_value(), "acme realty ltda");

        let cnpj = &scores[1];
        assert_eq!(cnpj.field(), LeadField::Cnpj);
        assert_eq!(cnpj.similarity(), 1.0);
        assert!(approx(cnpj.contribution(), 3500.0 / 75.0));

        let weight_sum: f64 = scores.iter().map(|s| s.weight()).sum();
        assert!(approx(weight_sum, 100.0));
    }

    #[test]
    fn test_match_pair_domain_mismatch_scores_zero() {
        let matcher = FieldMatcher::default();
        let input = normalized_input(
            DuplicateCheckInput::new("Acme").with_website("acme.com"),
        );
        let existing = normalized_existing(
            ExistingLead::new("1", "Acme").with_website("acme.com.br"),
        );

        let scores = matcher.match_pair(&input, &existing);
        let website = scores
            .iter()
            .find(|s| s.field() == LeadField::WebsiteDomain)
            .unwrap();
        assert_eq!(website.similarity(), 0.0);
        assert_eq!(website.contribution(), 0.0);
        assert!(approx(website.weight(), 500.0 / 45.0));
    }
}
