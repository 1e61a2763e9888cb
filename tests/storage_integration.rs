use std::env;
use std::time::Duration;

use rust_lead_dedup::db::Database;
use rust_lead_dedup::lead_storage::{LeadScope, LeadStorage};
use rust_lead_dedup::models::DuplicateCheckInput;
use rust_lead_dedup::normalizer::normalize_text;
use rust_lead_dedup::ranker::DuplicateRanker;

/// Integration smoke test for loading existing leads from Postgres.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn load_existing_leads_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 2).await?;
    let storage = LeadStorage::new(db.pool.clone(), 50, Duration::from_secs(60));

    let leads = storage.existing_leads(LeadScope::default(), true).await?;
    assert!(leads.len() <= 50);

    // Second load is served from cache
    let cached = storage.existing_leads(LeadScope::default(), false).await?;
    assert_eq!(leads.as_slice(), cached.as_slice());

    // A stored lead with a usable name matches itself
    if let Some(first) = leads.iter().find(|l| !normalize_text(&l.legal_name).is_empty()) {
        let ranker = DuplicateRanker::default();
        let result = ranker.rank(&DuplicateCheckInput::from(first), &leads);
        assert!(result.iter().any(|c| c.lead_id() == first.id));
    }

    Ok(())
}

/// The full-set load used by the scan ignores the per-check limit.
#[tokio::test]
#[ignore]
async fn fetch_all_leads_is_uncapped() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 2).await?;
    let storage = LeadStorage::new(db.pool.clone(), 1, Duration::from_secs(60));
    let scope = LeadScope::new(true);

    let capped = storage.fetch_existing_leads(scope).await?;
    let all = storage.fetch_all_leads(scope).await?;

    assert!(capped.len() <= 1);
    assert!(all.len() >= capped.len());
    assert_eq!(all.first(), capped.first());

    Ok(())
}
