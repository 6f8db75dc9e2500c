//! Growth forecasting
//!
//! This module provides:
//! - The fit/predict contract for growth estimators
//! - A least-squares linear trend estimator
//! - The atomically-replaceable model store
//! - The forecast engine with its average-daily-gain fallback

mod engine;
mod model_store;
mod regression;

pub use engine::{ForecastEngine, TrainedArtifact, STUB_SAMPLE_THRESHOLD};
pub use model_store::{ModelMetadata, ModelStatus, ModelStore, PublishedModel};
pub use regression::{fit_linear_trend, GrowthEstimator, LinearTrendModel};
