//! HTTP API: health, metrics, analysis, alternatives and validation

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use optimizer_lib::{
    health::{ComponentStatus, HealthRegistry},
    storage::RecommendationFilter,
    AnalysisRequest, OptimizerError, Provider, RecommendationAction, RecommendationEngine,
    RecommendationStatus, SavingsValidator, TenantPreferences, TradeoffScorer,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub engine: Arc<RecommendationEngine>,
    pub scorer: Arc<TradeoffScorer>,
    pub validator: Arc<SavingsValidator>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        engine: Arc<RecommendationEngine>,
        scorer: Arc<TradeoffScorer>,
        validator: Arc<SavingsValidator>,
    ) -> Self {
        Self {
            health_registry,
            engine,
            scorer,
            validator,
        }
    }
}

/// Error returned by API handlers, always rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Optimizer(OptimizerError),
}

impl From<OptimizerError> for ApiError {
    fn from(err: OptimizerError) -> Self {
        ApiError::Optimizer(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Optimizer(err) => {
                let status = match &err {
                    OptimizerError::UnknownProvider(_)
                    | OptimizerError::MalformedResourceId(_)
                    | OptimizerError::InvalidWeights(_) => StatusCode::BAD_REQUEST,
                    OptimizerError::NotFound { .. } => StatusCode::NOT_FOUND,
                    OptimizerError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    _ => {
                        error!(error = %err, "Request failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn parse_provider(provider: &str) -> Result<Provider, ApiError> {
    Ok(provider.parse::<Provider>()?)
}

/// Analyze a resource; the body may carry a detected configuration
async fn analyze(
    State(state): State<Arc<AppState>>,
    Path((tenant, provider, resource_id)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<optimizer_lib::AnalysisResult> {
    let provider = parse_provider(&provider)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        AnalysisRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid analysis request: {}", e)))?
    };

    let result = state
        .engine
        .analyze_resource_cached(&tenant, provider, &resource_id, &request)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct AlternativesQuery {
    sku: Option<String>,
    region: Option<String>,
}

async fn alternatives(
    State(state): State<Arc<AppState>>,
    Path((tenant, provider, resource_id)): Path<(String, String, String)>,
    Query(query): Query<AlternativesQuery>,
) -> ApiResult<optimizer_lib::AlternativeComparison> {
    let provider = parse_provider(&provider)?;
    let sku = query
        .sku
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'sku' is required".to_string()))?;
    let region = query
        .region
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'region' is required".to_string()))?;

    let comparison = state
        .scorer
        .compare_alternatives(&tenant, provider, &resource_id, &sku, &region)
        .await?;
    Ok(Json(comparison))
}

async fn run_validation(
    State(state): State<Arc<AppState>>,
) -> ApiResult<optimizer_lib::ValidationRunSummary> {
    info!("Validation run requested");
    Ok(Json(state.validator.run_daily_validation().await?))
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    tenant: Option<String>,
    provider: Option<String>,
    resource_id: Option<String>,
    action: Option<RecommendationAction>,
    status: Option<RecommendationStatus>,
}

async fn list_recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> ApiResult<Vec<optimizer_lib::Recommendation>> {
    let filter = RecommendationFilter {
        tenant: query.tenant,
        provider: query.provider.as_deref().map(parse_provider).transpose()?,
        resource_id: query.resource_id,
        action: query.action,
        status: query.status,
    };
    Ok(Json(state.engine.list_recommendations(&filter).await?))
}

async fn implement_recommendation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<optimizer_lib::ImplementedRecommendation> {
    let implemented = state
        .engine
        .implement_recommendation(id, chrono::Utc::now())
        .await?;
    Ok(Json(implemented))
}

async fn dismiss_recommendation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<optimizer_lib::Recommendation> {
    Ok(Json(state.engine.dismiss_recommendation(id).await?))
}

async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> ApiResult<TenantPreferences> {
    Ok(Json(state.scorer.preferences(&tenant).await?))
}

async fn put_preferences(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Json(mut preferences): Json<TenantPreferences>,
) -> ApiResult<TenantPreferences> {
    preferences.tenant = tenant;
    Ok(Json(state.scorer.update_preferences(preferences).await?))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route(
            "/api/v1/analysis/:tenant/:provider/:resource_id",
            post(analyze),
        )
        .route(
            "/api/v1/alternatives/:tenant/:provider/:resource_id",
            get(alternatives),
        )
        .route("/api/v1/validation/run", post(run_validation))
        .route("/api/v1/recommendations", get(list_recommendations))
        .route(
            "/api/v1/recommendations/:id/implement",
            post(implement_recommendation),
        )
        .route(
            "/api/v1/recommendations/:id/dismiss",
            post(dismiss_recommendation),
        )
        .route(
            "/api/v1/preferences/:tenant",
            get(get_preferences).put(put_preferences),
        )
        .with_state(state)
}

/// Start the API server
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
