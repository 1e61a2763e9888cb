use crate::config::Config;
use crate::detection::{check_against_storage, detect_duplicates};
use crate::errors::AppError;
use crate::import::{check_import_rows, ImportSettings};
use crate::lead_storage::{LeadScope, LeadStorage};
use crate::models::*;
use crate::ranker::DuplicateRanker;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request size limit: 5MB max payload.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Ranker built from the configured thresholds.
    pub ranker: Arc<DuplicateRanker>,
    /// Cached, breaker-guarded access to stored leads.
    pub lead_storage: LeadStorage,
    pub import_settings: ImportSettings,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let lead_storage = LeadStorage::new(
            pool,
            config.existing_leads_limit,
            config.existing_leads_cache_ttl(),
        );

        Self {
            ranker: Arc::new(config.ranker()),
            import_settings: config.import_settings(),
            lead_storage,
            config,
        }
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-dedup",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

fn require_legal_name(lead: &DuplicateCheckInput) -> Result<(), AppError> {
    if lead.has_legal_name() {
        Ok(())
    } else {
        Err(AppError::BadRequest("legal_name is required".to_string()))
    }
}

/// POST /api/v1/leads/duplicates/check
///
/// Checks a lead about to be saved against the stored leads.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - The lead being created or edited, plus detection options.
///
/// # Returns
///
/// * `Result<Json<DuplicateCheckResponse>, AppError>` - Ranked candidates, or
///   `400` for a blank legal name, `503` while the lead store breaker is open.
pub async fn check_duplicates(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DuplicateCheckRequest>,
) -> Result<Json<DuplicateCheckResponse>, AppError> {
    tracing::info!(
        "POST /leads/duplicates/check - legal_name: {}",
        payload.lead.legal_name
    );
    require_legal_name(&payload.lead)?;

    let response = check_against_storage(
        &state.lead_storage,
        &state.ranker,
        &payload.lead,
        &payload.options,
        state.config.max_results,
    )
    .await?;

    tracing::info!(
        "Duplicate check done: {} candidate(s), {} high, {} compared",
        response.duplicates.len(),
        response.high_severity_count,
        response.compared
    );

    Ok(Json(response))
}

/// POST /api/v1/leads/duplicates/compare
///
/// Same check against a lead set supplied in the request. Storage is not touched.
pub async fn compare_duplicates(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompareRequest>,
) -> Result<Json<DuplicateCheckResponse>, AppError> {
    tracing::info!(
        "POST /leads/duplicates/compare - {} existing lead(s)",
        payload.existing.len()
    );
    require_legal_name(&payload.lead)?;

    let response = detect_duplicates(
        &state.ranker,
        &payload.lead,
        &payload.existing,
        &payload.options,
        state.config.max_results,
    );

    Ok(Json(response))
}

/// POST /api/v1/leads/import/duplicates
///
/// Conflict check for the rows of an import file. Uses the supplied existing
/// set when present, otherwise the stored leads with the default scope.
pub async fn check_import_duplicates(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImportCheckRequest>,
) -> Result<Json<ImportDuplicateReport>, AppError> {
    tracing::info!("POST /leads/import/duplicates - {} row(s)", payload.rows.len());

    let existing = match payload.existing {
        Some(existing) => Arc::new(existing),
        None => {
            state
                .lead_storage
                .existing_leads(LeadScope::default(), false)
                .await?
        }
    };

    let ranker = state.ranker.clone();
    let settings = state.import_settings;
    let rows = payload.rows;

    // CPU-bound: keep it off the async workers
    let report = tokio::task::spawn_blocking(move || {
        check_import_rows(&ranker, &rows, &existing, settings)
    })
    .await?;

    Ok(Json(report))
}

/// Duplicate detection endpoints with the request size limit applied.
///
/// Rate limiting is layered on by the server binary.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/leads/duplicates/check", post(check_duplicates))
        .route("/api/v1/leads/duplicates/compare", post(compare_duplicates))
        .route("/api/v1/leads/import/duplicates", post(check_import_duplicates))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
}

/// Full application: health check, the given API routes, tracing and CORS.
pub fn app(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Application without rate limiting.
pub fn build_router(state: Arc<AppState>) -> Router {
    app(state, api_routes())
}
