//! Integration tests for the engine API endpoints

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use engine_lib::context::{EngineContext, EngineSettings};
use engine_lib::error::EngineError;
use engine_lib::models::{Animal, HealthRequest, WeightRecord};
use engine_lib::probe::ComponentStatus;
use engine_lib::store::MemoryStore;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone)]
struct AppState {
    ctx: Arc<EngineContext>,
    default_horizon_days: u32,
}

fn error_response(err: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        EngineError::UnknownAnimal(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.ctx.probes.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.ctx.probes.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

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
        Err(err) => error_response(err),
    }
}

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
        Err(err) => error_response(err),
    }
}

async fn register_animal(
    State(state): State<Arc<AppState>>,
    Json(animal): Json<Animal>,
) -> impl IntoResponse {
    match state.ctx.register_animal(animal).await {
        Ok(created) => (
            if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            },
            Json(json!({ "created": created })),
        ),
        Err(err) => error_response(err),
    }
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/animals", post(register_animal))
        .route("/animals/:id/forecast", get(forecast))
        .route("/animals/:id/diagnosis", post(diagnosis))
        .route("/health-status", post(health_status))
        .with_state(state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let ctx = Arc::new(
        EngineContext::new(Arc::new(MemoryStore::new()), EngineSettings::default()).unwrap(),
    );
    let state = Arc::new(AppState {
        ctx,
        default_horizon_days: 30,
    });
    let router = create_test_router(state.clone());
    (router, state)
}

async fn register_cow(state: &Arc<AppState>, id: &str) {
    state
        .ctx
        .register_animal(Animal {
            animal_id: id.to_string(),
            species: "cattle".to_string(),
            birth_date: chrono::NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
        })
        .await
        .unwrap();
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_forecast_short_history_returns_structured_status() {
    let (app, state) = setup_test_app().await;
    register_cow(&state, "COW-1").await;

    let response = app
        .oneshot(get_request("/animals/COW-1/forecast?days_ahead=7"))
        .await
        .unwrap();

    // Degradation is a 200 with an explicit status, never an error code
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "insufficient_data");
    assert!(body["prediction"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_forecast_unknown_animal_returns_404() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(get_request("/animals/GHOST/forecast"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forecast_rejects_zero_horizon() {
    let (app, state) = setup_test_app().await;
    register_cow(&state, "COW-1").await;

    let response = app
        .oneshot(get_request("/animals/COW-1/forecast?days_ahead=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forecast_after_retrain_serves_model() {
    let (app, state) = setup_test_app().await;
    register_cow(&state, "COW-1").await;
    for i in 0..12 {
        state
            .ctx
            .record_weight(WeightRecord {
                animal_id: "COW-1".to_string(),
                weight_kg: 220.0 + 2.0 * i as f64,
                recorded_at: i * 86_400,
            })
            .await
            .unwrap();
    }
    assert!(state.ctx.retrain_growth_model().await.is_published());

    let response = app
        .oneshot(get_request("/animals/COW-1/forecast?days_ahead=5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "model");
    assert_eq!(body["prediction"].as_array().unwrap().len(), 5);
    assert!(body["model_version"].is_number());
}

#[tokio::test]
async fn test_register_animal_endpoint_is_idempotent() {
    let (app, _state) = setup_test_app().await;
    let animal = json!({
        "animal_id": "COW-9",
        "species": "cattle",
        "birth_date": "2023-04-01"
    });

    let response = app
        .clone()
        .oneshot(post_json("/animals", animal.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(post_json("/animals", animal)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["created"], false);
}

#[tokio::test]
async fn test_health_status_missing_fields_is_still_200() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json(
            "/health-status",
            json!({ "animal_id": "COW-1", "temperature": 39.0, "activity": null }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["risk"], "missing_data");
    assert_eq!(body["status"], "unknown");
}

#[tokio::test]
async fn test_health_status_fever_is_high_risk() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json(
            "/health-status",
            json!({ "animal_id": "COW-1", "temperature": 41.0, "activity": 10.0 }),
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["risk"], "high");
    assert_eq!(body["status"], "alert");
}

#[tokio::test]
async fn test_diagnosis_ranks_candidates() {
    let (app, state) = setup_test_app().await;
    register_cow(&state, "COW-1").await;

    let response = app
        .oneshot(post_json(
            "/animals/COW-1/diagnosis",
            json!({ "temperature": 41.5, "activity": 10.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(!body["ranked"].as_array().unwrap().is_empty());
    assert_ne!(body["disease"], "Healthy");
    assert!(!body["action"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_diagnosis_unknown_animal_returns_404() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json(
            "/animals/GHOST/diagnosis",
            json!({ "temperature": 41.5, "activity": 10.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_readyz_reflects_engine_start() {
    let (app, state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(get_request("/readyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let (tx, _) = tokio::sync::broadcast::channel(1);
    state.ctx.start(tx.subscribe()).await;

    let response = app.oneshot(get_request("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    drop(tx);
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, state) = setup_test_app().await;
    let (tx, _) = tokio::sync::broadcast::channel(1);
    state.ctx.start(tx.subscribe()).await;

    let response = app.oneshot(get_request("/healthz")).await.unwrap();
    let body = json_body(response).await;

    assert!(body["components"].is_object());
    assert!(body["components"]["model_store"].is_object());
    assert!(body["components"]["scheduler"].is_object());
    drop(tx);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_engine_metrics() {
    let (app, state) = setup_test_app().await;
    register_cow(&state, "COW-1").await;

    // Drive at least one forecast so counters exist
    let _ = state.ctx.forecast_growth("COW-1", 7).await.unwrap();

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("livestock_engine_forecast_latency_seconds"));
    assert!(metrics_text.contains("livestock_engine_forecasts_generated_total"));
}
