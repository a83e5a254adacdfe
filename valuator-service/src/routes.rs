//! HTTP API routes.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use valuator_common::logging::generate_trace_id;
use valuator_common::Config;

use crate::error::ServiceError;
use crate::narrative::{generate_or_fallback, AzureOpenAiNarrator, NarrativeGenerator};
use crate::request::ValuationRequest;
use crate::store::{ValuationRecord, ValuationStore, ValuationUpdate};
use crate::valuation::{Industry, QuickEstimate, ValuationConfig, ValuationEngine, ValuationResult};

const DEFAULT_RECENT_LIMIT: usize = 10;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValuationEngine>,
    pub store: Arc<ValuationStore>,
    pub narrator: Arc<dyn NarrativeGenerator>,
    pub recent_limit: usize,
}

impl AppState {
    pub fn new(engine: ValuationEngine, narrator: Arc<dyn NarrativeGenerator>) -> Self {
        Self {
            engine: Arc::new(engine),
            store: Arc::new(ValuationStore::new()),
            narrator,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    /// State wired from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let engine = ValuationEngine::with_config(ValuationConfig::from(&config.valuation));
        let narrator = Arc::new(AzureOpenAiNarrator::new(config.narrative.clone()));
        Self::new(engine, narrator).with_recent_limit(config.store.recent_limit)
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/valuations", post(create_valuation).get(list_valuations))
        .route("/api/valuations/:id", get(get_valuation))
        .route("/api/quick-calculator", post(quick_calculator))
        .layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

/// Attach a trace id span to every request and log its outcome.
async fn trace_requests(request: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let start = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });
    response
}

// ============ Health Check ============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: "valuator".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

// ============ Valuations ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValuationResponse {
    pub success: bool,
    pub valuation_id: u64,
    pub results: ValuationResult,
}

pub async fn create_valuation(
    State(state): State<AppState>,
    payload: Result<Json<ValuationRequest>, JsonRejection>,
) -> Result<Json<CreateValuationResponse>, ServiceError> {
    let Json(request) = payload?;
    request.validate()?;

    let mut results = state.engine.compute_valuation(&request.profile())?;
    results.ai_analysis = generate_or_fallback(state.narrator.as_ref(), &request, &results).await;

    let record = state.store.create(&request).await;
    state
        .store
        .update(record.id, ValuationUpdate::from(&results))
        .await;

    tracing::info!(
        valuation_id = record.id,
        industry = %request.industry_category(),
        range = %results.valuation_range,
        confidence = results.confidence,
        "Valuation completed"
    );

    Ok(Json(CreateValuationResponse {
        success: true,
        valuation_id: record.id,
        results,
    }))
}

pub async fn get_valuation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ValuationRecord>, ServiceError> {
    let id: u64 = id
        .parse()
        .map_err(|_| ServiceError::InvalidRequest("Invalid valuation id".into()))?;

    state
        .store
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("Valuation not found".into()))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListValuationsResponse {
    pub success: bool,
    pub valuations: Vec<ValuationRecord>,
    pub count: usize,
}

pub async fn list_valuations(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ListValuationsResponse>, ServiceError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.recent_limit);

    let valuations = state.store.recent(limit).await;
    Ok(Json(ListValuationsResponse {
        success: true,
        count: valuations.len(),
        valuations,
    }))
}

// ============ Quick Calculator ============

#[derive(Debug, Default, Deserialize)]
pub struct QuickCalculatorRequest {
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub industry: Option<String>,
}

pub async fn quick_calculator(
    State(state): State<AppState>,
    payload: Result<Json<QuickCalculatorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(request) = payload?;
    let industry = Industry::from_label(request.industry.as_deref().unwrap_or_default());

    let estimate: QuickEstimate = state
        .engine
        .quick_estimate(request.revenue, request.ebitda, industry)?;

    Ok(Json(estimate))
}
