//! Background retraining scheduler
//!
//! A recurring job that refits the growth model from the full historical
//! dataset and atomically publishes it, and refits the anomaly detector
//! from the full sensor table in the same pass. Runs never overlap: a
//! trigger that arrives while a run is in flight is skipped, and a
//! failed run leaves the previously published model in place.

use crate::anomaly::AnomalyDetector;
use crate::forecast::{
    ForecastEngine, ModelMetadata, ModelStatus, ModelStore, STUB_SAMPLE_THRESHOLD,
};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::probe::{components, ProbeRegistry};
use crate::store::DataAccess;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Default retraining interval (24 hours)
pub const DEFAULT_RETRAIN_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of asking the scheduler to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    Started,
    /// The background loop is already running; the call was a no-op
    AlreadyStarted,
}

/// Outcome of one retraining trigger
#[derive(Debug, Clone)]
pub enum RetrainOutcome {
    /// A new model was fitted and published
    Published(ModelMetadata),
    /// Training failed; the previous model is untouched
    Failed(String),
    /// Another run was already in flight
    Skipped,
}

impl RetrainOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RetrainOutcome::Published(_))
    }
}

/// Drives periodic growth-model retraining and atomic publication
pub struct RetrainScheduler {
    engine: Arc<ForecastEngine>,
    models: Arc<ModelStore>,
    detector: Arc<AnomalyDetector>,
    store: Arc<dyn DataAccess>,
    probes: ProbeRegistry,
    metrics: EngineMetrics,
    logger: StructuredLogger,
    retrain_interval: Duration,
    running: AtomicBool,
    started: AtomicBool,
}

impl RetrainScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<ForecastEngine>,
        models: Arc<ModelStore>,
        detector: Arc<AnomalyDetector>,
        store: Arc<dyn DataAccess>,
        probes: ProbeRegistry,
        metrics: EngineMetrics,
        logger: StructuredLogger,
        retrain_interval: Duration,
    ) -> Self {
        Self {
            engine,
            models,
            detector,
            store,
            probes,
            metrics,
            logger,
            retrain_interval,
            running: AtomicBool::new(false),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the background retraining loop. Safe to call more than once
    /// per process: the second and later calls are no-ops that report
    /// [`StartResult::AlreadyStarted`].
    pub fn start(self: &Arc<Self>, shutdown: broadcast::Receiver<()>) -> StartResult {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Retrain scheduler already started, ignoring");
            return StartResult::AlreadyStarted;
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(scheduler.run_loop(shutdown));
        StartResult::Started
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.retrain_interval.as_secs(),
            "Starting retrain scheduler"
        );

        // First tick fires immediately, so a fresh process trains from
        // whatever history already exists
        let mut ticker = interval(self.retrain_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.retrain_now().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down retrain scheduler");
                    break;
                }
            }
        }
    }

    /// Run one retraining pass now. Shared by the timer and the manual
    /// trigger; overlapping calls are serialized by skipping.
    pub async fn retrain_now(&self) -> RetrainOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Retraining already in flight, skipping trigger");
            return RetrainOutcome::Skipped;
        }

        let outcome = self.run_once().await;
        self.running.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_once(&self) -> RetrainOutcome {
        let outcome = match self.engine.train().await {
            Ok(artifact) => {
                let status = if artifact.sample_count < STUB_SAMPLE_THRESHOLD {
                    ModelStatus::Stub
                } else {
                    ModelStatus::Trained
                };
                let meta = self
                    .models
                    .publish(artifact.estimator, artifact.sample_count, status);

                self.metrics.inc_retrain_runs();
                self.metrics
                    .set_model_version(meta.version, status_label(status));
                self.logger
                    .log_model_published(meta.version, meta.sample_count, &meta.checksum);
                self.probes.set_healthy(components::SCHEDULER).await;
                self.probes.set_healthy(components::MODEL_STORE).await;

                RetrainOutcome::Published(meta)
            }
            Err(e) => {
                self.metrics.inc_retrain_failures();
                self.logger.log_retrain_failed(&e.to_string());
                self.probes
                    .set_degraded(components::SCHEDULER, e.to_string())
                    .await;
                RetrainOutcome::Failed(e.to_string())
            }
        };

        // The anomaly detector refits in the same pass; a sensor table
        // that is still empty just leaves it untrained.
        self.refit_detector().await;

        outcome
    }

    async fn refit_detector(&self) {
        let readings = match self.store.list_all_sensor_history().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Sensor table read failed, detector unchanged");
                self.probes
                    .set_degraded(components::ANOMALY_DETECTOR, e.to_string())
                    .await;
                return;
            }
        };

        if readings.is_empty() {
            debug!("No sensor history yet, anomaly detector stays untrained");
            return;
        }

        let matrix: Vec<[f64; 2]> = readings
            .iter()
            .map(|r| [r.temperature_c, r.activity])
            .collect();

        match self.detector.train(&matrix) {
            Ok(()) => {
                self.probes.set_healthy(components::ANOMALY_DETECTOR).await;
            }
            Err(e) => {
                warn!(error = %e, "Anomaly detector refit failed, previous fit retained");
                self.probes
                    .set_degraded(components::ANOMALY_DETECTOR, e.to_string())
                    .await;
            }
        }
    }
}

fn status_label(status: ModelStatus) -> &'static str {
    match status {
        ModelStatus::Trained => "trained",
        ModelStatus::Stub => "stub",
        ModelStatus::Stale => "stale",
    }
}
