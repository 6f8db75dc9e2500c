//! Unsupervised anomaly detection over sensor readings
//!
//! Learns the distribution of normal (temperature, activity) pairs and
//! flags out-of-distribution samples. Training replaces internal state
//! wholesale; there is no incremental merge.

mod detector;

pub use detector::{AnomalyConfig, AnomalyDetector, Verdict, DEFAULT_CONTAMINATION};
