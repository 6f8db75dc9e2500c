//! Hybrid health risk classification
//!
//! Two-tier decision: the anomaly model runs first when it is trained,
//! and the deterministic threshold rules run as a safety net underneath.
//! The model tier returns an explicit `Result` that the classifier
//! pattern-matches on; a missing or faulty model can never block the
//! rule tier.

use crate::alert::{AlertDispatcher, AlertReason};
use crate::anomaly::{AnomalyDetector, Verdict};
use crate::models::{HealthAssessment, HealthRequest, HealthState, RiskLevel};
use crate::observability::EngineMetrics;
use std::sync::Arc;
use tracing::debug;

/// Threshold rules, fixed configuration evaluated after the model tier.
/// Defaults are the documented compatibility values.
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    /// Temperature at or above which risk is high (°C)
    pub high_temp: f64,
    /// Temperature at or above which risk is medium (°C)
    pub warn_temp: f64,
    /// Activity at or below which risk is high
    pub low_activity: f64,
    /// Activity at or below which risk is medium
    pub warn_activity: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            high_temp: 40.5,
            warn_temp: 39.5,
            low_activity: 25.0,
            warn_activity: 50.0,
        }
    }
}

/// Combines the anomaly detector verdict with threshold rules
pub struct HealthClassifier {
    detector: Arc<AnomalyDetector>,
    dispatcher: Arc<AlertDispatcher>,
    thresholds: HealthThresholds,
    metrics: EngineMetrics,
}

impl HealthClassifier {
    pub fn new(
        detector: Arc<AnomalyDetector>,
        dispatcher: Arc<AlertDispatcher>,
        thresholds: HealthThresholds,
        metrics: EngineMetrics,
    ) -> Self {
        Self {
            detector,
            dispatcher,
            thresholds,
            metrics,
        }
    }

    /// Classify one sensor payload into a risk tier.
    ///
    /// Produces a fresh assessment per request; nothing is persisted.
    pub async fn classify(&self, req: &HealthRequest) -> HealthAssessment {
        let (temp, activity) = match (req.temperature, req.activity) {
            (Some(t), Some(a)) => (t, a),
            _ => {
                return HealthAssessment {
                    status: HealthState::Unknown,
                    risk: RiskLevel::MissingData,
                    message: "Incomplete sensor data".to_string(),
                }
            }
        };

        // Model tier. An untrained or failing detector falls through to
        // the rules below.
        match self.detector.predict([temp, activity]) {
            Ok(Verdict::Anomaly) => {
                self.metrics.inc_anomalies_detected();
                if self
                    .dispatcher
                    .dispatch(
                        &req.animal_id,
                        AlertReason::AnomalyDetected,
                        "Anomaly detected: sensor readings outside learned behaviour",
                    )
                    .await
                {
                    self.metrics.inc_alerts_dispatched();
                }
                return HealthAssessment {
                    status: HealthState::Alert,
                    risk: RiskLevel::High,
                    message: "Anomaly detected (possible illness)".to_string(),
                };
            }
            Ok(Verdict::Normal) => {}
            Err(e) => {
                debug!(animal_id = %req.animal_id, error = %e, "Model tier unavailable, using rules");
            }
        }

        // Rule tier, always evaluated when the model did not already alert
        if temp >= self.thresholds.high_temp || activity <= self.thresholds.low_activity {
            if self
                .dispatcher
                .dispatch(
                    &req.animal_id,
                    AlertReason::CriticalVitals,
                    "Critical health warning: fever or inactivity",
                )
                .await
            {
                self.metrics.inc_alerts_dispatched();
            }
            return HealthAssessment {
                status: HealthState::Alert,
                risk: RiskLevel::High,
                message: "High fever or severe inactivity detected".to_string(),
            };
        }

        if temp >= self.thresholds.warn_temp || activity <= self.thresholds.warn_activity {
            return HealthAssessment {
                status: HealthState::Warning,
                risk: RiskLevel::Medium,
                message: "Possible early stress or infection".to_string(),
            };
        }

        HealthAssessment {
            status: HealthState::Normal,
            risk: RiskLevel::Low,
            message: "Animal appears healthy".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::transport_for;
    use crate::anomaly::AnomalyConfig;
    use crate::models::AlertChannel;

    fn classifier() -> (HealthClassifier, Arc<AnomalyDetector>) {
        let detector = Arc::new(AnomalyDetector::new(AnomalyConfig::default()));
        let dispatcher = Arc::new(AlertDispatcher::new(transport_for(AlertChannel::Console)));
        (
            HealthClassifier::new(
                Arc::clone(&detector),
                dispatcher,
                HealthThresholds::default(),
                EngineMetrics::new(),
            ),
            detector,
        )
    }

    fn request(temperature: Option<f64>, activity: Option<f64>) -> HealthRequest {
        HealthRequest {
            animal_id: "COW-1".to_string(),
            temperature,
            activity,
        }
    }

    #[tokio::test]
    async fn test_missing_fields_yield_unknown() {
        let (classifier, _) = classifier();

        let assessment = classifier.classify(&request(Some(39.0), None)).await;
        assert_eq!(assessment.status, HealthState::Unknown);
        assert_eq!(assessment.risk, RiskLevel::MissingData);

        let assessment = classifier.classify(&request(None, Some(60.0))).await;
        assert_eq!(assessment.risk, RiskLevel::MissingData);
    }

    #[tokio::test]
    async fn test_rule_tier_fires_without_trained_model() {
        let (classifier, detector) = classifier();
        assert!(!detector.is_trained());

        let assessment = classifier.classify(&request(Some(41.0), Some(10.0))).await;
        assert_eq!(assessment.risk, RiskLevel::High);
        assert_eq!(assessment.status, HealthState::Alert);
    }

    #[tokio::test]
    async fn test_healthy_vitals_are_low_risk() {
        let (classifier, _) = classifier();
        let assessment = classifier.classify(&request(Some(38.0), Some(70.0))).await;
        assert_eq!(assessment.risk, RiskLevel::Low);
        assert_eq!(assessment.status, HealthState::Normal);
    }

    #[tokio::test]
    async fn test_warning_band_is_medium_risk() {
        let (classifier, _) = classifier();

        let assessment = classifier.classify(&request(Some(39.7), Some(70.0))).await;
        assert_eq!(assessment.risk, RiskLevel::Medium);

        let assessment = classifier.classify(&request(Some(38.2), Some(45.0))).await;
        assert_eq!(assessment.risk, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_anomaly_verdict_short_circuits_to_high() {
        let (classifier, detector) = classifier();

        let baseline: Vec<[f64; 2]> = (0..60)
            .map(|i| [38.4 + (i % 3) as f64 * 0.1, 68.0 + (i % 6) as f64])
            .collect();
        detector.train(&baseline).unwrap();

        // Within rule bands but far outside the learned distribution
        let assessment = classifier.classify(&request(Some(39.3), Some(120.0))).await;
        assert_eq!(assessment.risk, RiskLevel::High);
        assert_eq!(assessment.status, HealthState::Alert);
    }

    #[tokio::test]
    async fn test_rules_still_apply_when_model_says_normal() {
        let (classifier, detector) = classifier();

        // Train on a sick-looking baseline so a feverish sample scores normal
        let feverish: Vec<[f64; 2]> = (0..60)
            .map(|i| [41.0 + (i % 3) as f64 * 0.1, 10.0 + (i % 6) as f64])
            .collect();
        detector.train(&feverish).unwrap();

        let assessment = classifier.classify(&request(Some(41.0), Some(12.0))).await;
        // Model tier says normal, rule tier still escalates
        assert_eq!(assessment.risk, RiskLevel::High);
    }
}
