//! Error taxonomy for the livestock engine
//!
//! Every inference-path error is recovered locally into a typed result with
//! an explicit status field; only configuration errors (such as a malformed
//! diagnostic knowledge base) are allowed to abort process start.

use thiserror::Error;

/// Minimum ordered samples required before a model-backed path may run.
/// Below this the engine degrades to an explicit insufficient-data result.
pub const MIN_SAMPLES: usize = 3;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer than [`MIN_SAMPLES`] ordered samples; always recoverable
    #[error("insufficient data: {have} samples, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// Growth model missing or failed to produce usable output;
    /// triggers the average-daily-gain fallback
    #[error("growth model unavailable: {0}")]
    ModelUnavailable(String),

    /// Anomaly predict called before train; callers fall back to rules
    #[error("anomaly model not trained")]
    ModelNotTrained,

    /// Missing or malformed request fields, surfaced as an unknown status
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Retraining failed; the previously published model stays in place
    #[error("training failed: {0}")]
    TrainingFailed(String),

    /// Animal id does not resolve against the data store
    #[error("unknown animal: {0}")]
    UnknownAnimal(String),

    /// Data store rejected a read or write; surfaced to callers only on
    /// ingestion paths, inference paths degrade instead
    #[error("storage error: {0}")]
    Storage(String),
}
