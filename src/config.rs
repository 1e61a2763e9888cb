use crate::import::ImportSettings;
use crate::ranker::{DuplicateRanker, SeverityTable, DEFAULT_DETECTION_THRESHOLD};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Upper bound of existing leads loaded per check.
    pub existing_leads_limit: usize,
    pub existing_leads_cache_ttl_secs: u64,
    /// Detection threshold: scores below it are never reported.
    pub min_score: f64,
    pub severity_high: f64,
    pub severity_medium: f64,
    /// Default number of candidates returned by a check.
    pub max_results: usize,
    /// Import rows whose best match reaches this score are conflicts.
    pub import_conflict_score: f64,
    /// Candidates kept per conflicting import row.
    pub import_max_matches: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            config.database_url.chars().take(20).collect::<String>()
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Dedup thresholds: min {} / medium {} / high {}, import conflict {}",
            config.min_score,
            config.severity_medium,
            config.severity_high,
            config.import_conflict_score
        );

        Ok(config)
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            database_url: var("DB_URL")
                .or_else(|| var("DATABASE_URL"))
                .ok_or_else(|| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: parse_or(var("PORT"), 3000, "PORT must be a valid number between 1-65535")?,
            db_max_connections: parse_or(
                var("DB_MAX_CONNECTIONS"),
                10,
                "DB_MAX_CONNECTIONS must be a positive number",
            )?,
            existing_leads_limit: parse_or(
                var("EXISTING_LEADS_LIMIT"),
                1000,
                "EXISTING_LEADS_LIMIT must be a positive number",
            )?,
            existing_leads_cache_ttl_secs: parse_or(
                var("EXISTING_LEADS_CACHE_TTL_SECS"),
                300,
                "EXISTING_LEADS_CACHE_TTL_SECS must be a number of seconds",
            )?,
            min_score: parse_or(
                var("DEDUP_MIN_SCORE"),
                DEFAULT_DETECTION_THRESHOLD,
                "DEDUP_MIN_SCORE must be a number",
            )?,
            severity_high: parse_or(
                var("DEDUP_SEVERITY_HIGH"),
                SeverityTable::default().high,
                "DEDUP_SEVERITY_HIGH must be a number",
            )?,
            severity_medium: parse_or(
                var("DEDUP_SEVERITY_MEDIUM"),
                SeverityTable::default().medium,
                "DEDUP_SEVERITY_MEDIUM must be a number",
            )?,
            max_results: parse_or(
                var("DEDUP_MAX_RESULTS"),
                5,
                "DEDUP_MAX_RESULTS must be a positive number",
            )?,
            import_conflict_score: parse_or(
                var("IMPORT_CONFLICT_SCORE"),
                70.0,
                "IMPORT_CONFLICT_SCORE must be a number",
            )?,
            import_max_matches: parse_or(
                var("IMPORT_MAX_MATCHES"),
                3,
                "IMPORT_MAX_MATCHES must be a positive number",
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS cannot be zero");
        }
        if self.existing_leads_limit == 0 || self.max_results == 0 || self.import_max_matches == 0 {
            anyhow::bail!("Result limits cannot be zero");
        }
        if !(0.0..=100.0).contains(&self.min_score) {
            anyhow::bail!("DEDUP_MIN_SCORE must be between 0 and 100");
        }
        if !(self.min_score <= self.severity_medium
            && self.severity_medium < self.severity_high
            && self.severity_high <= 100.0)
        {
            anyhow::bail!(
                "Severity thresholds must satisfy DEDUP_MIN_SCORE <= DEDUP_SEVERITY_MEDIUM < DEDUP_SEVERITY_HIGH <= 100"
            );
        }
        if !(self.min_score..=100.0).contains(&self.import_conflict_score) {
            anyhow::bail!("IMPORT_CONFLICT_SCORE must be between DEDUP_MIN_SCORE and 100");
        }
        Ok(())
    }

    pub fn severity_table(&self) -> SeverityTable {
        SeverityTable {
            high: self.severity_high,
            medium: self.severity_medium,
        }
    }

    /// Ranker with the configured thresholds and default field rules.
    pub fn ranker(&self) -> DuplicateRanker {
        DuplicateRanker::with_thresholds(self.min_score, self.severity_table())
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            conflict_score: self.import_conflict_score,
            max_matches: self.import_max_matches,
        }
    }

    pub fn existing_leads_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.existing_leads_cache_ttl_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    default: T,
    message: &'static str,
) -> anyhow::Result<T> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| anyhow::anyhow!(message)),
        None => Ok(default),
    }
}
