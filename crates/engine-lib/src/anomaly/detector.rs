//! Statistical out-of-distribution detector
//!
//! Scores a sample by the euclidean norm of its per-feature z-scores
//! against the training distribution. The decision threshold is set so
//! that the configured contamination fraction of the training data would
//! itself be flagged, which keeps the detector calibrated to whatever
//! noise the herd's sensors actually produce.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Fraction of training data assumed to be outliers
pub const DEFAULT_CONTAMINATION: f64 = 0.10;

/// Floor applied to per-feature standard deviation so near-constant
/// training data still yields finite scores
const MIN_STD: f64 = 1e-6;

/// Number of features per sample: temperature, activity
const NUM_FEATURES: usize = 2;

/// Detector verdict for a single sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Normal,
    Anomaly,
}

/// Detector configuration
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    pub contamination: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
        }
    }
}

/// Immutable fitted state, swapped wholesale on retrain
#[derive(Debug)]
struct FittedState {
    mean: [f64; NUM_FEATURES],
    std: [f64; NUM_FEATURES],
    threshold: f64,
    sample_count: usize,
}

impl FittedState {
    fn score(&self, sample: [f64; NUM_FEATURES]) -> f64 {
        let mut sum_sq = 0.0;
        for i in 0..NUM_FEATURES {
            let z = (sample[i] - self.mean[i]) / self.std[i];
            sum_sq += z * z;
        }
        sum_sq.sqrt()
    }
}

/// Unsupervised detector over (temperature, activity) pairs
#[derive(Debug, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    state: RwLock<Option<Arc<FittedState>>>,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    /// Whether a training pass has completed
    pub fn is_trained(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Fit the detector on historical sensor rows. Idempotent: each call
    /// replaces the previous fit wholesale.
    ///
    /// Fails with [`EngineError::TrainingFailed`] on an empty matrix.
    pub fn train(&self, sensor_matrix: &[[f64; NUM_FEATURES]]) -> Result<(), EngineError> {
        if sensor_matrix.is_empty() {
            return Err(EngineError::TrainingFailed(
                "empty sensor matrix".to_string(),
            ));
        }

        let n = sensor_matrix.len() as f64;
        let mut mean = [0.0; NUM_FEATURES];
        for row in sensor_matrix {
            for i in 0..NUM_FEATURES {
                mean[i] += row[i];
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut std = [0.0; NUM_FEATURES];
        for row in sensor_matrix {
            for i in 0..NUM_FEATURES {
                std[i] += (row[i] - mean[i]).powi(2);
            }
        }
        for s in std.iter_mut() {
            *s = (*s / n).sqrt().max(MIN_STD);
        }

        // Threshold at the (1 - contamination) quantile of training scores
        let probe = FittedState {
            mean,
            std,
            threshold: f64::INFINITY,
            sample_count: sensor_matrix.len(),
        };
        let mut scores: Vec<f64> = sensor_matrix.iter().map(|row| probe.score(*row)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let cut = ((1.0 - self.config.contamination) * (scores.len() - 1) as f64).round() as usize;
        let threshold = scores[cut.min(scores.len() - 1)];

        let fitted = Arc::new(FittedState {
            mean,
            std,
            threshold,
            sample_count: sensor_matrix.len(),
        });

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = Some(fitted);

        info!(
            samples = sensor_matrix.len(),
            threshold, "Anomaly detector trained"
        );
        Ok(())
    }

    /// Classify one sensor sample.
    ///
    /// Calling predict before any train is a precondition violation and
    /// signals [`EngineError::ModelNotTrained`]; callers treat that as
    /// "use the rule-based fallback", never as fatal.
    pub fn predict(&self, sample: [f64; NUM_FEATURES]) -> Result<Verdict, EngineError> {
        let state = self
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(EngineError::ModelNotTrained)?;

        let score = state.score(sample);
        let verdict = if score > state.threshold {
            Verdict::Anomaly
        } else {
            Verdict::Normal
        };
        debug!(score, threshold = state.threshold, ?verdict, "Scored sensor sample");
        Ok(verdict)
    }

    /// Number of samples behind the current fit, if trained
    pub fn sample_count(&self) -> Option<usize> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.sample_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn herd_baseline() -> Vec<[f64; 2]> {
        // Healthy cattle: ~38.5 C, activity around 70
        (0..100)
            .map(|i| {
                [
                    38.3 + (i % 5) as f64 * 0.1,
                    65.0 + (i % 10) as f64,
                ]
            })
            .collect()
    }

    #[test]
    fn test_predict_before_train_signals_not_trained() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let err = detector.predict([38.5, 70.0]).unwrap_err();
        assert!(matches!(err, EngineError::ModelNotTrained));
        assert!(!detector.is_trained());
    }

    #[test]
    fn test_far_outlier_is_flagged_after_training() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        detector.train(&herd_baseline()).unwrap();

        // Fever plus near-total inactivity
        let verdict = detector.predict([41.5, 5.0]).unwrap();
        assert_eq!(verdict, Verdict::Anomaly);

        let verdict = detector.predict([38.5, 70.0]).unwrap();
        assert_eq!(verdict, Verdict::Normal);
    }

    #[test]
    fn test_near_identical_rows_still_detect_outliers() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let rows: Vec<[f64; 2]> = (0..50).map(|_| [38.5, 70.0]).collect();
        detector.train(&rows).unwrap();

        assert_eq!(detector.predict([38.5, 70.0]).unwrap(), Verdict::Normal);
        assert_eq!(detector.predict([42.0, 3.0]).unwrap(), Verdict::Anomaly);
    }

    #[test]
    fn test_retrain_replaces_state_wholesale() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        detector.train(&herd_baseline()).unwrap();
        assert_eq!(detector.sample_count(), Some(100));

        // Retrain on a shifted distribution; old fit must not linger
        let shifted: Vec<[f64; 2]> = (0..40).map(|i| [40.0, 20.0 + (i % 4) as f64]).collect();
        detector.train(&shifted).unwrap();
        assert_eq!(detector.sample_count(), Some(40));

        // What was an outlier before is now in-distribution
        assert_eq!(detector.predict([40.0, 21.0]).unwrap(), Verdict::Normal);
    }

    #[test]
    fn test_empty_matrix_fails_training() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let err = detector.train(&[]).unwrap_err();
        assert!(matches!(err, EngineError::TrainingFailed(_)));
        assert!(!detector.is_trained());
    }
}
