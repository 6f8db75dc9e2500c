//! Livestock intelligence engine
//!
//! Core library behind the livestock engine service: growth forecasting
//! with model lifecycle management, hybrid rule-plus-model health risk
//! classification, disease diagnostic scoring, sensor anomaly detection,
//! scheduled retraining, and alert dispatch. The service binary wires an
//! [`EngineContext`] over a [`store::DataAccess`] implementation and
//! serves the operations over HTTP.

pub mod alert;
pub mod anomaly;
pub mod context;
pub mod diagnosis;
pub mod error;
pub mod forecast;
pub mod health;
pub mod models;
pub mod observability;
pub mod probe;
pub mod scheduler;
pub mod store;

pub use context::{EngineContext, EngineSettings};
pub use error::{EngineError, MIN_SAMPLES};
