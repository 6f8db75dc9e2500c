//! Forecast engine
//!
//! Serves growth forecasts from the published model when one exists and
//! degrades to an average-daily-gain projection when it does not. The
//! training routine here is only ever invoked by the retraining scheduler
//! (or its manual trigger) and never by the inference path.

use super::model_store::{ModelStore, PublishedModel};
use super::regression::{fit_linear_trend, GrowthEstimator};
use crate::error::{EngineError, MIN_SAMPLES};
use crate::models::{
    ExplainConfidence, ForecastResult, ForecastStatus, GrowthExplanation, GrowthTrend,
};
use crate::store::DataAccess;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest forecast horizon accepted from callers
const MAX_HORIZON_DAYS: u32 = 365;

/// Below this many training pairs a fitted model is published as a stub
pub const STUB_SAMPLE_THRESHOLD: usize = 10;

/// History length at which a growth explanation is considered high confidence
const EXPLAIN_HIGH_CONFIDENCE_SAMPLES: usize = 5;

/// A fitted-but-unpublished model returned by the training routine
#[derive(Debug)]
pub struct TrainedArtifact {
    pub estimator: Arc<dyn GrowthEstimator>,
    pub sample_count: usize,
}

/// Fits and serves growth forecasts for individual animals
pub struct ForecastEngine {
    store: Arc<dyn DataAccess>,
    models: Arc<ModelStore>,
    target_weight_kg: f64,
}

impl ForecastEngine {
    pub fn new(store: Arc<dyn DataAccess>, models: Arc<ModelStore>, target_weight_kg: f64) -> Self {
        Self {
            store,
            models,
            target_weight_kg,
        }
    }

    /// Forecast the next `days_ahead` daily weights for one animal.
    ///
    /// Short histories surface as an insufficient-data status, and a
    /// missing or misbehaving model falls back to the average-daily-gain
    /// projection; neither ever escapes as an error.
    pub async fn forecast(
        &self,
        animal_id: &str,
        days_ahead: u32,
    ) -> Result<ForecastResult, EngineError> {
        if days_ahead == 0 || days_ahead > MAX_HORIZON_DAYS {
            return Err(EngineError::InvalidInput(format!(
                "days_ahead must be 1..={MAX_HORIZON_DAYS}, got {days_ahead}"
            )));
        }

        match self.store.animal_exists(animal_id).await {
            Ok(true) => {}
            Ok(false) => return Err(EngineError::UnknownAnimal(animal_id.to_string())),
            Err(e) => {
                // Slow or failing store must not fault the caller
                warn!(animal_id, error = %e, "Data store lookup failed, degrading");
                return Ok(ForecastResult::insufficient_data());
            }
        }

        let history = match self.store.list_weight_history(animal_id).await {
            Ok(h) => h,
            Err(e) => {
                warn!(animal_id, error = %e, "Weight history read failed, degrading");
                return Ok(ForecastResult::insufficient_data());
            }
        };

        let weights: Vec<f64> = history.iter().map(|r| r.weight_kg).collect();
        if weights.len() < MIN_SAMPLES {
            debug!(animal_id, samples = weights.len(), "Insufficient history");
            return Ok(ForecastResult::insufficient_data());
        }

        if let Some(model) = self.models.current() {
            match predict_with_model(&model, weights.len(), days_ahead) {
                Ok(prediction) => {
                    let eta_days = self.eta_to_target(&prediction);
                    return Ok(ForecastResult {
                        status: ForecastStatus::Model,
                        prediction,
                        eta_days,
                        model_version: Some(model.meta.version),
                    });
                }
                Err(e) => {
                    // Logged, not surfaced; the fallback below covers it
                    warn!(animal_id, error = %e, "Model prediction unusable, falling back");
                }
            }
        }

        let prediction = adg_projection(&weights, days_ahead);
        let eta_days = self.eta_to_target(&prediction);
        Ok(ForecastResult {
            status: ForecastStatus::Fallback,
            prediction,
            eta_days,
            model_version: None,
        })
    }

    /// Fit a fresh global growth model across every animal's history.
    ///
    /// Returns the fitted artifact without publishing it; publication is
    /// the scheduler's job. An empty dataset is a failure signal, not a
    /// fault.
    pub async fn train(&self) -> Result<TrainedArtifact, EngineError> {
        let samples = self
            .store
            .list_all_weight_history()
            .await
            .map_err(|e| EngineError::TrainingFailed(format!("weight table read: {e}")))?;

        if samples.is_empty() {
            return Err(EngineError::TrainingFailed(
                "empty training dataset".to_string(),
            ));
        }

        let pairs: Vec<(f64, f64)> = samples
            .iter()
            .map(|s| (s.sample_index as f64, s.weight_kg))
            .collect();

        let model = fit_linear_trend(&pairs)?;
        debug!(
            samples = pairs.len(),
            slope = model.slope,
            "Fitted growth model"
        );

        Ok(TrainedArtifact {
            estimator: Arc::new(model),
            sample_count: pairs.len(),
        })
    }

    /// Summarize an animal's growth behaviour from the published model
    /// slope. Short histories and a missing model both degrade to an
    /// insufficient-data trend rather than an error.
    pub async fn explain(&self, animal_id: &str) -> Result<GrowthExplanation, EngineError> {
        match self.store.animal_exists(animal_id).await {
            Ok(true) => {}
            Ok(false) => return Err(EngineError::UnknownAnimal(animal_id.to_string())),
            Err(e) => {
                warn!(animal_id, error = %e, "Data store lookup failed, degrading");
                return Ok(insufficient_explanation());
            }
        }

        let history = self
            .store
            .list_weight_history(animal_id)
            .await
            .unwrap_or_default();

        let model = match self.models.current() {
            Some(m) if history.len() >= MIN_SAMPLES => m,
            _ => return Ok(insufficient_explanation()),
        };

        let rate = model.estimator.params().first().copied().unwrap_or(0.0);
        let trend = if rate > 0.5 {
            GrowthTrend::Fast
        } else if rate > 0.1 {
            GrowthTrend::Normal
        } else {
            GrowthTrend::Stalled
        };
        let confidence = if history.len() >= EXPLAIN_HIGH_CONFIDENCE_SAMPLES {
            ExplainConfidence::High
        } else {
            ExplainConfidence::Medium
        };

        Ok(GrowthExplanation {
            trend,
            rate,
            confidence,
        })
    }

    /// First 1-based horizon day at which the prediction reaches the
    /// configured target weight
    fn eta_to_target(&self, prediction: &[f64]) -> Option<u32> {
        prediction
            .iter()
            .position(|w| *w >= self.target_weight_kg)
            .map(|i| i as u32 + 1)
    }
}

fn insufficient_explanation() -> GrowthExplanation {
    GrowthExplanation {
        trend: GrowthTrend::InsufficientData,
        rate: 0.0,
        confidence: ExplainConfidence::Low,
    }
}

/// Predict the next `days_ahead` sample indices with the published model
fn predict_with_model(
    model: &PublishedModel,
    history_len: usize,
    days_ahead: u32,
) -> Result<Vec<f64>, EngineError> {
    let start = history_len as f64;
    let prediction: Vec<f64> = (0..days_ahead)
        .map(|i| model.estimator.predict(start + i as f64))
        .collect();

    if prediction.iter().any(|w| !w.is_finite()) {
        return Err(EngineError::ModelUnavailable(
            "model produced non-finite prediction".to_string(),
        ));
    }
    Ok(prediction)
}

/// Linear projection from the mean first-difference of the weight series.
/// Never fails given at least two numeric samples.
fn adg_projection(weights: &[f64], days_ahead: u32) -> Vec<f64> {
    let diffs: Vec<f64> = weights.windows(2).map(|w| w[1] - w[0]).collect();
    let adg = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let last = *weights.last().unwrap_or(&0.0);

    (1..=days_ahead).map(|i| last + adg * i as f64).collect()
}
