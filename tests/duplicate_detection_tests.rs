//! End-to-end duplicate detection scenarios over the public API.

use rust_lead_dedup::detection::detect_duplicates;
use rust_lead_dedup::import::{check_import_rows, ImportSettings};
use rust_lead_dedup::models::{
    DetectionOptions, DuplicateCheckInput, ExistingLead, ImportRowInput, ImportRowStatus,
    LeadField, MatchSeverity,
};
use rust_lead_dedup::ranker::DuplicateRanker;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn crm_leads() -> Vec<ExistingLead> {
    vec![
        ExistingLead::new("acme", "ACME Realty LTDA")
            .with_cnpj("12345678000190")
            .with_email("joao@acmerealty.com.br")
            .with_website("https://www.acmerealty.com.br"),
        ExistingLead::new("beta", "Beta Capital").with_cnpj("99.999.999/0001-11"),
        ExistingLead::new("padaria", "Padaria São José")
            .with_trade_name("Pão Quente")
            .with_email("padaria@gmail.com"),
    ]
}

#[test]
fn acme_realty_is_reported_and_beta_is_not() {
    let ranker = DuplicateRanker::default();
    let input = DuplicateCheckInput::new("Acme Realty").with_cnpj("12.345.678/0001-90");

    let result = ranker.rank(&input, &crm_leads());

    assert_eq!(result.len(), 1);
    let acme = &result[0];
    assert_eq!(acme.lead_id(), "acme");
    assert_eq!(acme.severity(), MatchSeverity::High);
    assert!(approx(acme.score(), 3500.0 / 75.0 + 0.6875 * 4000.0 / 75.0));

    let cnpj = acme.field_score(LeadField::Cnpj).unwrap();
    assert_eq!(cnpj.similarity(), 1.0);
    assert_eq!(cnpj.input_value(), "12345678000190");
    assert_eq!(cnpj.label(), "CNPJ");
}

#[test]
fn missing_optional_fields_do_not_penalize() {
    let ranker = DuplicateRanker::default();

    // Same company, the new lead only has the legal name filled in
    let result = ranker.rank(&DuplicateCheckInput::new("Acme Realty Ltda."), &crm_leads());

    assert_eq!(result[0].lead_id(), "acme");
    assert_eq!(result[0].score(), 100.0);
    assert_eq!(result[0].field_scores().len(), 1);
}

#[test]
fn corporate_email_domain_counts_but_free_mail_does_not() {
    let ranker = DuplicateRanker::default();

    let corporate = DuplicateCheckInput::new("Acme Imobiliaria")
        .with_email("maria@AcmeRealty.com.br");
    let result = ranker.rank(&corporate, &crm_leads());
    let acme = result.iter().find(|c| c.lead_id() == "acme").unwrap();
    assert_eq!(
        acme.field_score(LeadField::EmailDomain).unwrap().similarity(),
        1.0
    );

    let free_mail = DuplicateCheckInput::new("Padaria Sao Jose").with_email("outro@gmail.com");
    let result = ranker.rank(&free_mail, &crm_leads());
    let padaria = result.iter().find(|c| c.lead_id() == "padaria").unwrap();
    assert!(padaria.field_score(LeadField::EmailDomain).is_none());
    assert_eq!(padaria.score(), 100.0);
}

#[test]
fn website_and_trade_name_take_part_when_present_on_both_sides() {
    let ranker = DuplicateRanker::default();
    let input = DuplicateCheckInput::new("Padaria Sao Jose")
        .with_trade_name("Pao Quente")
        .with_website("paoquente.com.br");

    let result = ranker.rank(&input, &crm_leads());
    let padaria = &result[0];

    assert_eq!(padaria.lead_id(), "padaria");
    assert!(padaria.field_score(LeadField::TradeName).is_some());
    // Existing lead has no website
    assert!(padaria.field_score(LeadField::WebsiteDomain).is_none());
    // 40 and 10 rescaled to 80 and 20
    assert!(approx(
        padaria.field_score(LeadField::LegalName).unwrap().weight(),
        80.0
    ));
}

#[test]
fn check_options_apply_on_top_of_ranking() {
    let ranker = DuplicateRanker::default();
    let leads = vec![
        ExistingLead::new("1", "Acme Realty"),
        ExistingLead::new("2", "Acme Realty Ltda"),
    ];
    let options = DetectionOptions {
        min_score: Some(80.0),
        ..Default::default()
    };

    let response = detect_duplicates(
        &ranker,
        &DuplicateCheckInput::new("Acme Realty"),
        &leads,
        &options,
        5,
    );

    assert_eq!(response.duplicates.len(), 1);
    assert_eq!(response.high_severity_count, 1);
    assert_eq!(response.compared, 2);
}

#[test]
fn candidate_serializes_for_the_ui() {
    let ranker = DuplicateRanker::default();
    let input = DuplicateCheckInput::new("Acme Realty").with_cnpj("12.345.678/0001-90");
    let result = ranker.rank(&input, &crm_leads());

    let json = serde_json::to_value(&result[0]).unwrap();
    assert_eq!(json["lead_id"], "acme");
    assert_eq!(json["legal_name"], "ACME Realty LTDA");
    assert_eq!(json["severity"], "high");
    assert_eq!(json["field_scores"][0]["field"], "legal_name");
    assert_eq!(json["field_scores"][0]["label"], "Razão Social");
    assert_eq!(json["field_scores"][1]["field"], "cnpj");
}

#[test]
fn import_flags_conflicts_and_invalid_rows() {
    let rows = vec![
        ImportRowInput {
            row_number: 2,
            legal_name: Some("ACME REALTY LTDA".to_string()),
            cnpj: Some("12.345.678/0001-90".to_string()),
            ..Default::default()
        },
        ImportRowInput {
            row_number: 3,
            legal_name: None,
            cnpj: Some("99999999000111".to_string()),
            ..Default::default()
        },
        ImportRowInput {
            row_number: 4,
            legal_name: Some("Gamma Tecnologia".to_string()),
            ..Default::default()
        },
    ];

    let report = check_import_rows(
        &DuplicateRanker::default(),
        &rows,
        &crm_leads(),
        ImportSettings::default(),
    );

    assert_eq!(report.total, 3);
    assert_eq!(report.rows[0].status, ImportRowStatus::Duplicate);
    assert_eq!(report.rows[0].duplicates[0].lead_id(), "acme");
    assert_eq!(report.rows[1].status, ImportRowStatus::Invalid);
    assert_eq!(report.rows[2].status, ImportRowStatus::Clean);
}

#[test]
fn scores_on_tier_boundaries_are_kept_and_classified() {
    let ranker = DuplicateRanker::default();
    let existing = vec![
        ExistingLead::new("low", "aaaaaaaaabbbbbbbbbbb").with_website("beta.com"),
        ExistingLead::new("medium", "aaaabbb").with_trade_name("cccccdd"),
    ];

    let at_threshold = DuplicateCheckInput::new("aaaaaaaaaaaaaaaaaaaa").with_website("alpha.com");
    let response = detect_duplicates(
        &ranker,
        &at_threshold,
        &existing,
        &DetectionOptions {
            min_score: Some(40.0),
            ..Default::default()
        },
        5,
    );
    assert_eq!(response.duplicates.len(), 1);
    assert_eq!(response.duplicates[0].lead_id(), "low");
    assert_eq!(response.duplicates[0].score(), 40.0);
    assert_eq!(response.duplicates[0].severity(), MatchSeverity::Low);

    let at_medium = DuplicateCheckInput::new("aaaaaaa").with_trade_name("ccccccc");
    let result = ranker.rank(&at_medium, &existing);
    let medium = result.iter().find(|c| c.lead_id() == "medium").unwrap();
    assert_eq!(medium.score(), 60.0);
    assert_eq!(medium.severity(), MatchSeverity::Medium);
}
