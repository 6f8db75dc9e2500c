//! Engine context: wiring and the public operation surface
//!
//! Builds every engine component against a caller-supplied data store and
//! exposes the operations the service binary serves. All cross-component
//! wiring lives here; individual components never construct each other.

use crate::alert::{transport_for, AlertDispatcher};
use crate::anomaly::{AnomalyConfig, AnomalyDetector};
use crate::diagnosis::DiagnosticScorer;
use crate::error::EngineError;
use crate::forecast::{ForecastEngine, ModelStore};
use crate::health::{HealthClassifier, HealthThresholds};
use crate::models::{
    AlertChannel, Animal, DiagnosisResult, ForecastResult, ForecastStatus, GrowthExplanation,
    HealthAssessment, HealthRequest, SensorRecord, WeightRecord,
};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::probe::{components, ProbeRegistry};
use crate::scheduler::{RetrainOutcome, RetrainScheduler, StartResult};
use crate::store::DataAccess;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::warn;

/// Tunables the binary resolves from its configuration layer
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub farm_id: String,
    /// Market weight the forecast counts down to (kg)
    pub target_weight_kg: f64,
    pub retrain_interval: Duration,
    pub alert_channel: AlertChannel,
    pub contamination: f64,
    pub thresholds: HealthThresholds,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            farm_id: "default".to_string(),
            target_weight_kg: 400.0,
            retrain_interval: crate::scheduler::DEFAULT_RETRAIN_INTERVAL,
            alert_channel: AlertChannel::Console,
            contamination: crate::anomaly::DEFAULT_CONTAMINATION,
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Fully wired engine; one per process, shared behind an `Arc`
pub struct EngineContext {
    store: Arc<dyn DataAccess>,
    models: Arc<ModelStore>,
    detector: Arc<AnomalyDetector>,
    forecaster: Arc<ForecastEngine>,
    classifier: HealthClassifier,
    scorer: DiagnosticScorer,
    scheduler: Arc<RetrainScheduler>,
    pub probes: ProbeRegistry,
    pub metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl EngineContext {
    /// Wire the engine against a data store.
    ///
    /// Fails only on configuration errors, such as a malformed diagnostic
    /// knowledge base; those abort process start by design of the caller.
    pub fn new(
        store: Arc<dyn DataAccess>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let metrics = EngineMetrics::new();
        let logger = StructuredLogger::new(settings.farm_id.clone());
        let probes = ProbeRegistry::new();

        let models = Arc::new(ModelStore::new());
        let detector = Arc::new(AnomalyDetector::new(AnomalyConfig {
            contamination: settings.contamination,
        }));
        let forecaster = Arc::new(ForecastEngine::new(
            Arc::clone(&store),
            Arc::clone(&models),
            settings.target_weight_kg,
        ));
        let dispatcher = Arc::new(AlertDispatcher::new(transport_for(settings.alert_channel)));
        let classifier = HealthClassifier::new(
            Arc::clone(&detector),
            dispatcher,
            settings.thresholds,
            metrics.clone(),
        );
        let scorer = DiagnosticScorer::new()?;
        let scheduler = Arc::new(RetrainScheduler::new(
            Arc::clone(&forecaster),
            Arc::clone(&models),
            Arc::clone(&detector),
            Arc::clone(&store),
            probes.clone(),
            metrics.clone(),
            logger.clone(),
            settings.retrain_interval,
        ));

        Ok(Self {
            store,
            models,
            detector,
            forecaster,
            classifier,
            scorer,
            scheduler,
            probes,
            metrics,
            logger,
        })
    }

    /// Register probe components and launch the retraining loop
    pub async fn start(&self, shutdown: broadcast::Receiver<()>) -> StartResult {
        for name in [
            components::MODEL_STORE,
            components::SCHEDULER,
            components::ANOMALY_DETECTOR,
            components::DATA_ACCESS,
        ] {
            self.probes.register(name).await;
        }
        let result = self.scheduler.start(shutdown);
        self.probes.set_ready(true).await;
        result
    }

    /// Forecast daily weights for one animal over the given horizon
    pub async fn forecast_growth(
        &self,
        animal_id: &str,
        days_ahead: u32,
    ) -> Result<ForecastResult, EngineError> {
        let started = Instant::now();
        let result = self.forecaster.forecast(animal_id, days_ahead).await?;
        self.metrics
            .observe_forecast_latency(started.elapsed().as_secs_f64());
        self.metrics.inc_forecasts_generated();
        if result.status == ForecastStatus::Fallback {
            self.metrics.inc_fallback_forecasts();
        }
        self.logger
            .log_forecast(animal_id, status_label(result.status), days_ahead, result.eta_days);
        Ok(result)
    }

    /// Classify one sensor payload into a risk tier
    pub async fn health_status(&self, req: &HealthRequest) -> HealthAssessment {
        let assessment = self.classifier.classify(req).await;
        self.logger
            .log_health_assessment(&req.animal_id, risk_label(&assessment));
        assessment
    }

    /// Rank candidate diagnoses for an animal's current vitals.
    ///
    /// The animal must be registered; the scoring itself is stateless.
    pub async fn diagnose_disease(
        &self,
        animal_id: &str,
        temperature: f64,
        activity: f64,
    ) -> Result<DiagnosisResult, EngineError> {
        match self.store.animal_exists(animal_id).await {
            Ok(true) => {}
            Ok(false) => return Err(EngineError::UnknownAnimal(animal_id.to_string())),
            Err(e) => {
                // Scoring needs no history; a flaky store does not block it
                warn!(animal_id, error = %e, "Data store lookup failed, diagnosing anyway");
            }
        }
        Ok(self.scorer.diagnose(temperature, activity))
    }

    /// Summarize an animal's growth trend from the published model
    pub async fn explain_growth(
        &self,
        animal_id: &str,
    ) -> Result<GrowthExplanation, EngineError> {
        self.forecaster.explain(animal_id).await
    }

    /// Trigger a retraining pass outside the schedule
    pub async fn retrain_growth_model(&self) -> RetrainOutcome {
        self.scheduler.retrain_now().await
    }

    /// Register a new animal. Returns false when the id already existed
    /// and the registration was a no-op.
    pub async fn register_animal(&self, animal: Animal) -> Result<bool, EngineError> {
        if animal.animal_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "animal_id must not be empty".to_string(),
            ));
        }
        self.store
            .register_animal(animal)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// Append one weight measurement and flag the published model stale
    pub async fn record_weight(&self, record: WeightRecord) -> Result<(), EngineError> {
        if !(record.weight_kg.is_finite() && record.weight_kg > 0.0) {
            return Err(EngineError::InvalidInput(
                "weight_kg must be a positive number".to_string(),
            ));
        }
        self.ensure_known(&record.animal_id).await?;
        self.store
            .add_weight(record)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        // The published model has not seen this measurement; the next
        // scheduled or manual retrain clears the flag
        self.models.mark_stale();
        Ok(())
    }

    /// Append one sensor reading
    pub async fn record_sensor(&self, record: SensorRecord) -> Result<(), EngineError> {
        if !record.temperature_c.is_finite() || !record.activity.is_finite() {
            return Err(EngineError::InvalidInput(
                "temperature_c and activity must be numbers".to_string(),
            ));
        }
        self.ensure_known(&record.animal_id).await?;
        self.store
            .add_sensor(record)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Detector handle, exposed for readiness reporting
    pub fn anomaly_trained(&self) -> bool {
        self.detector.is_trained()
    }

    async fn ensure_known(&self, animal_id: &str) -> Result<(), EngineError> {
        match self.store.animal_exists(animal_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(EngineError::UnknownAnimal(animal_id.to_string())),
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }
}

fn status_label(status: ForecastStatus) -> &'static str {
    match status {
        ForecastStatus::Model => "model",
        ForecastStatus::Fallback => "fallback",
        ForecastStatus::InsufficientData => "insufficient_data",
    }
}

fn risk_label(assessment: &HealthAssessment) -> &'static str {
    match assessment.risk {
        crate::models::RiskLevel::Low => "low",
        crate::models::RiskLevel::Medium => "medium",
        crate::models::RiskLevel::High => "high",
        crate::models::RiskLevel::MissingData => "missing_data",
    }
}
