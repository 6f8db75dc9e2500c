//! Observability infrastructure
//!
//! Prometheus metrics for the inference and retraining paths, plus a
//! structured logger for significant domain events.

use prometheus::{
    register_gauge_vec, register_histogram, register_int_gauge, GaugeVec, Histogram, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for inference latency (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once per process)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    forecast_latency_seconds: Histogram,
    forecasts_generated: IntGauge,
    fallback_forecasts: IntGauge,
    anomalies_detected: IntGauge,
    alerts_dispatched: IntGauge,
    retrain_runs: IntGauge,
    retrain_failures: IntGauge,
    model_version_info: GaugeVec,
    animals_tracked: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            forecast_latency_seconds: register_histogram!(
                "livestock_engine_forecast_latency_seconds",
                "Time spent producing a growth forecast",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register forecast_latency_seconds"),

            forecasts_generated: register_int_gauge!(
                "livestock_engine_forecasts_generated_total",
                "Total number of growth forecasts generated"
            )
            .expect("Failed to register forecasts_generated"),

            fallback_forecasts: register_int_gauge!(
                "livestock_engine_fallback_forecasts_total",
                "Forecasts served by the average-daily-gain fallback"
            )
            .expect("Failed to register fallback_forecasts"),

            anomalies_detected: register_int_gauge!(
                "livestock_engine_anomalies_detected_total",
                "Sensor samples flagged as out of distribution"
            )
            .expect("Failed to register anomalies_detected"),

            alerts_dispatched: register_int_gauge!(
                "livestock_engine_alerts_dispatched_total",
                "Alerts handed to the notification transport"
            )
            .expect("Failed to register alerts_dispatched"),

            retrain_runs: register_int_gauge!(
                "livestock_engine_retrain_runs_total",
                "Completed growth-model retraining runs"
            )
            .expect("Failed to register retrain_runs"),

            retrain_failures: register_int_gauge!(
                "livestock_engine_retrain_failures_total",
                "Retraining runs that failed and kept the previous model"
            )
            .expect("Failed to register retrain_failures"),

            model_version_info: register_gauge_vec!(
                "livestock_engine_model_version_info",
                "Currently published growth model",
                &["version", "status"]
            )
            .expect("Failed to register model_version_info"),

            animals_tracked: register_int_gauge!(
                "livestock_engine_animals_tracked",
                "Animals registered in the data store"
            )
            .expect("Failed to register animals_tracked"),
        }
    }
}

/// Lightweight handle to the global engine metrics
#[derive(Clone, Default)]
pub struct EngineMetrics {
    _private: (),
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_forecast_latency(&self, duration_secs: f64) {
        self.inner().forecast_latency_seconds.observe(duration_secs);
    }

    pub fn inc_forecasts_generated(&self) {
        self.inner().forecasts_generated.inc();
    }

    pub fn inc_fallback_forecasts(&self) {
        self.inner().fallback_forecasts.inc();
    }

    pub fn inc_anomalies_detected(&self) {
        self.inner().anomalies_detected.inc();
    }

    pub fn inc_alerts_dispatched(&self) {
        self.inner().alerts_dispatched.inc();
    }

    pub fn inc_retrain_runs(&self) {
        self.inner().retrain_runs.inc();
    }

    pub fn inc_retrain_failures(&self) {
        self.inner().retrain_failures.inc();
    }

    /// Record the published model; resets the previous version label
    pub fn set_model_version(&self, version: u64, status: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[&version.to_string(), status])
            .set(1.0);
    }

    pub fn set_animals_tracked(&self, count: i64) {
        self.inner().animals_tracked.set(count);
    }
}

/// Structured logger for domain events
#[derive(Clone)]
pub struct StructuredLogger {
    farm_id: String,
}

impl StructuredLogger {
    pub fn new(farm_id: impl Into<String>) -> Self {
        Self {
            farm_id: farm_id.into(),
        }
    }

    pub fn log_forecast(&self, animal_id: &str, status: &str, horizon_days: u32, eta_days: Option<u32>) {
        info!(
            event = "forecast_generated",
            farm = %self.farm_id,
            animal_id = %animal_id,
            status = %status,
            horizon_days = horizon_days,
            eta_days = ?eta_days,
            "Generated growth forecast"
        );
    }

    pub fn log_health_assessment(&self, animal_id: &str, risk: &str) {
        info!(
            event = "health_assessed",
            farm = %self.farm_id,
            animal_id = %animal_id,
            risk = %risk,
            "Assessed animal health"
        );
    }

    pub fn log_model_published(&self, version: u64, sample_count: usize, checksum: &str) {
        info!(
            event = "model_published",
            farm = %self.farm_id,
            version = version,
            sample_count = sample_count,
            checksum = %checksum,
            "Published retrained growth model"
        );
    }

    pub fn log_retrain_failed(&self, reason: &str) {
        warn!(
            event = "retrain_failed",
            farm = %self.farm_id,
            reason = %reason,
            "Retraining failed, previous model retained"
        );
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "engine_started",
            farm = %self.farm_id,
            engine_version = %version,
            "Livestock engine started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            farm = %self.farm_id,
            reason = %reason,
            "Livestock engine shutting down"
        );
    }
}
