//! Scans the stored leads for pairs that look like the same company.
//!
//! Usage: `scan_duplicates [MIN_SCORE]` (default 60). Scores below the
//! configured `DEDUP_MIN_SCORE` are never reported.

use rust_lead_dedup::config::Config;
use rust_lead_dedup::db::Database;
use rust_lead_dedup::detection::find_duplicate_pairs;
use rust_lead_dedup::lead_storage::{LeadScope, LeadStorage};
use std::env;

const DEFAULT_MIN_SCORE: f64 = 60.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let min_score = match env::args().nth(1) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("MIN_SCORE must be a number, got {raw:?}"))?,
        None => DEFAULT_MIN_SCORE,
    };

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url, config.db_max_connections).await?;
    let storage = LeadStorage::new(
        db.pool.clone(),
        config.existing_leads_limit,
        config.existing_leads_cache_ttl(),
    );

    let leads = storage.fetch_all_leads(LeadScope::new(true)).await?;
    tracing::info!(
        "Loaded {} lead(s). Scanning for pairs scoring >= {}...",
        leads.len(),
        min_score
    );

    let ranker = config.ranker();
    let pairs = tokio::task::spawn_blocking(move || {
        find_duplicate_pairs(&ranker, &leads, min_score)
    })
    .await?;

    for pair in &pairs {
        println!(
            "{:>6.2}  {:<6}  {} ({})  <->  {} ({})",
            pair.candidate.score(),
            format!("{:?}", pair.candidate.severity()).to_lowercase(),
            pair.legal_name,
            pair.lead_id,
            pair.candidate.legal_name(),
            pair.candidate.lead_id()
        );
    }

    tracing::info!("Scan complete. Found {} duplicate pair(s).", pairs.len());

    Ok(())
}
