//! HTTP API for the engine operations, health checks and metrics
//!
//! Inference endpoints answer with structured statuses rather than error
//! codes wherever the engine can degrade; only unknown animals (404) and
//! malformed requests (400) surface as HTTP errors.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use engine_lib::context::EngineContext;
use engine_lib::error::EngineError;
use engine_lib::models::{Animal, HealthRequest, SensorRecord, WeightRecord};
use engine_lib::probe::ComponentStatus;
use engine_lib::scheduler::RetrainOutcome;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<EngineContext>,
    pub default_horizon_days: u32,
}

impl AppState {
    pub fn new(ctx: Arc<EngineContext>, default_horizon_days: u32) -> Self {
        Self {
            ctx,
            default_horizon_days,
        }
    }
}

fn error_response(err: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        EngineError::UnknownAnimal(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.ctx.probes.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.ctx.probes.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    days_ahead: Option<u32>,
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> impl IntoResponse {
    let days_ahead = query.days_ahead.unwrap_or(state.default_horizon_days);
    match state.ctx.forecast_growth(&animal_id, days_ahead).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(err) => {
            let (status, body) = error_response(err);
            (status, body)
        }
    }
}

async fn growth(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<String>,
) -> impl IntoResponse {
    match state.ctx.explain_growth(&animal_id).await {
        Ok(explanation) => (StatusCode::OK, Json(json!(explanation))),
        Err(err) => {
            let (status, body) = error_response(err);
            (status, body)
        }
    }
}

/// Risk classification always answers 200; missing fields come back as an
/// explicit missing-data assessment
async fn health_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HealthRequest>,
) -> impl IntoResponse {
    let assessment = state.ctx.health_status(&req).await;
    (StatusCode::OK, Json(json!(assessment)))
}

#[derive(Debug, Deserialize)]
struct DiagnosisBody {
    temperature: f64,
    activity: f64,
}

async fn diagnosis(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<String>,
    Json(body): Json<DiagnosisBody>,
) -> impl IntoResponse {
    match state
        .ctx
        .diagnose_disease(&animal_id, body.temperature, body.activity)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(err) => {
            let (status, body) = error_response(err);
            (status, body)
        }
    }
}

async fn register_animal(
    State(state): State<Arc<AppState>>,
    Json(animal): Json<Animal>,
) -> impl IntoResponse {
    match state.ctx.register_animal(animal).await {
        Ok(true) => (StatusCode::CREATED, Json(json!({ "created": true }))),
        Ok(false) => (StatusCode::OK, Json(json!({ "created": false }))),
        Err(err) => {
            let (status, body) = error_response(err);
            (status, body)
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeightBody {
    weight_kg: f64,
    recorded_at: Option<i64>,
}

async fn add_weight(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<String>,
    Json(body): Json<WeightBody>,
) -> impl IntoResponse {
    let record = WeightRecord {
        animal_id,
        weight_kg: body.weight_kg,
        recorded_at: body
            .recorded_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp()),
    };
    match state.ctx.record_weight(record).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "recorded": true }))),
        Err(err) => {
            let (status, body) = error_response(err);
            (status, body)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SensorBody {
    temperature_c: f64,
    activity: f64,
    timestamp: Option<i64>,
}

async fn add_sensor(
    State(state): State<Arc<AppState>>,
    Path(animal_id): Path<String>,
    Json(body): Json<SensorBody>,
) -> impl IntoResponse {
    let record = SensorRecord {
        animal_id,
        temperature_c: body.temperature_c,
        activity: body.activity,
        timestamp: body
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp()),
    };
    match state.ctx.record_sensor(record).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "recorded": true }))),
        Err(err) => {
            let (status, body) = error_response(err);
            (status, body)
        }
    }
}

/// Manual retraining trigger. A failed or skipped run is an ordinary
/// outcome, not a server error.
async fn retrain(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = match state.ctx.retrain_growth_model().await {
        RetrainOutcome::Published(meta) => json!({
            "result": "published",
            "version": meta.version,
            "sample_count": meta.sample_count,
            "status": meta.status,
        }),
        RetrainOutcome::Failed(reason) => json!({
            "result": "failed",
            "reason": reason,
        }),
        RetrainOutcome::Skipped => json!({ "result": "skipped" }),
    };
    (StatusCode::OK, Json(body))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/animals", post(register_animal))
        .route("/animals/:id/weights", post(add_weight))
        .route("/animals/:id/sensors", post(add_sensor))
        .route("/animals/:id/forecast", get(forecast))
        .route("/animals/:id/growth", get(growth))
        .route("/animals/:id/diagnosis", post(diagnosis))
        .route("/health-status", post(health_status))
        .route("/retrain", post(retrain))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
