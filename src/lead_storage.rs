use crate::circuit_breaker::{create_lead_store_circuit_breaker, LeadStoreBreaker};
use crate::errors::{AppError, ResultExt};
use crate::models::{ExistingLead, LeadRow};
use failsafe::futures::CircuitBreaker;
use moka::future::Cache;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Which stored leads a check compares against. Also the cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LeadScope {
    pub include_qualified: bool,
}

impl LeadScope {
    pub fn new(include_qualified: bool) -> Self {
        Self { include_qualified }
    }
}

/// Primary contact first, else the oldest linked contact with an email.
const EXISTING_LEADS_QUERY: &str = r#"
    SELECT
        l.id,
        l.legal_name,
        l.trade_name,
        l.cnpj,
        l.website,
        pc.email AS primary_contact_email,
        l.created_at
    FROM public.leads l
    LEFT JOIN LATERAL (
        SELECT c.email
        FROM public.lead_contacts lc
        JOIN public.contacts c ON c.id = lc.contact_id
        WHERE lc.lead_id = l.id
          AND c.email IS NOT NULL
        ORDER BY lc.is_primary DESC, lc.created_at ASC
        LIMIT 1
    ) pc ON true
    WHERE l.deleted_at IS NULL
      AND ($1::boolean OR l.qualified_at IS NULL)
    ORDER BY l.created_at ASC, l.id ASC
    LIMIT $2
"#;

/// Read side of the lead table used by duplicate checks.
///
/// Loads are cached per [`LeadScope`] and go through a circuit breaker, so a
/// burst of checks while the database is down fails fast.
#[derive(Clone)]
pub struct LeadStorage {
    pool: PgPool,
    limit: usize,
    cache: Cache<LeadScope, Arc<Vec<ExistingLead>>>,
    breaker: LeadStoreBreaker,
}

impl LeadStorage {
    pub fn new(pool: PgPool, limit: usize, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(256)
            .build();

        Self {
            pool,
            limit,
            cache,
            breaker: create_lead_store_circuit_breaker(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Existing leads for `scope`. With `refresh` the set is reloaded and the
    /// cache updated; otherwise a cached set younger than the TTL is reused.
    pub async fn existing_leads(
        &self,
        scope: LeadScope,
        refresh: bool,
    ) -> Result<Arc<Vec<ExistingLead>>, AppError> {
        if !refresh {
            if let Some(cached) = self.cache.get(&scope).await {
                tracing::debug!(?scope, count = cached.len(), "Existing leads served from cache");
                return Ok(cached);
            }
        }

        let leads = Arc::new(self.fetch_existing_leads(scope).await?);
        self.cache.insert(scope, leads.clone()).await;
        Ok(leads)
    }

    /// Load at most `limit` leads straight from the database, bypassing the cache.
    pub async fn fetch_existing_leads(
        &self,
        scope: LeadScope,
    ) -> Result<Vec<ExistingLead>, AppError> {
        self.fetch_leads(scope, Some(self.limit)).await
    }

    /// Load every lead in `scope`, without the per-check limit.
    pub async fn fetch_all_leads(&self, scope: LeadScope) -> Result<Vec<ExistingLead>, AppError> {
        self.fetch_leads(scope, None).await
    }

    async fn fetch_leads(
        &self,
        scope: LeadScope,
        limit: Option<usize>,
    ) -> Result<Vec<ExistingLead>, AppError> {
        // LIMIT NULL is no limit
        let query = sqlx::query_as::<_, LeadRow>(EXISTING_LEADS_QUERY)
            .bind(scope.include_qualified)
            .bind(limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX)))
            .fetch_all(&self.pool);

        let rows = match self.breaker.call(query).await {
            Ok(rows) => rows,
            Err(failsafe::Error::Inner(e)) => {
                tracing::error!("Failed to load existing leads: {}", e);
                return Err(e).context("Loading existing leads");
            }
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("Lead store circuit open, rejecting duplicate check");
                return Err(AppError::ServiceUnavailable(
                    "Lead storage circuit breaker is open".to_string(),
                ));
            }
        };

        if let Some(limit) = limit.filter(|limit| rows.len() >= *limit) {
            tracing::warn!(
                limit,
                "Existing lead set truncated; older leads beyond the limit are not compared"
            );
        }
        tracing::info!(?scope, count = rows.len(), "Loaded existing leads");

        Ok(rows.into_iter().map(ExistingLead::from).collect())
    }
}
