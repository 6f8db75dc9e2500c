//! Disease diagnostic scoring
//!
//! Scores current vitals against a small knowledge base of disease
//! fingerprints: fixed weight vectors over two normalized vital-sign
//! scores. The knowledge base and its action table are validated at
//! construction; a malformed entry is a configuration error and may
//! abort process start, never an inference-time fault.

use crate::error::EngineError;
use crate::models::{DiagnosisEntry, DiagnosisResult, Severity};
use std::collections::HashMap;

/// Probabilities at or below this are treated as noise
const NOISE_FLOOR: f64 = 0.4;

/// Centre of the fever sigmoid: a biologically normal-high temperature
const FEVER_PIVOT_C: f64 = 39.5;

/// Recommended action when a disease name has no table entry
const GENERIC_ACTION: &str = "Consult a veterinarian.";

/// A disease fingerprint: weights over [temp_score, activity_score]
/// plus the probability above which the case is critical
#[derive(Debug, Clone)]
struct Fingerprint {
    weights: [f64; 2],
    threshold: f64,
}

/// Ranks candidate diagnoses for a pair of vitals
pub struct DiagnosticScorer {
    knowledge_base: Vec<(String, Fingerprint)>,
    actions: HashMap<String, String>,
}

impl DiagnosticScorer {
    /// Build the scorer with the built-in cattle knowledge base
    pub fn new() -> Result<Self, EngineError> {
        let knowledge_base = vec![
            (
                "East Coast Fever".to_string(),
                Fingerprint {
                    weights: [0.7, 0.3],
                    threshold: 0.8,
                },
            ),
            (
                "Milk Fever".to_string(),
                Fingerprint {
                    weights: [0.4, 0.6],
                    threshold: 0.75,
                },
            ),
            (
                "Mastitis".to_string(),
                Fingerprint {
                    weights: [0.6, 0.4],
                    threshold: 0.65,
                },
            ),
        ];

        let actions: HashMap<String, String> = [
            (
                "East Coast Fever",
                "Immediate Buparvaquone therapy required.",
            ),
            ("Milk Fever", "IV Calcium Borogluconate needed."),
            ("Mastitis", "Intramammary antibiotic infusion."),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let scorer = Self {
            knowledge_base,
            actions,
        };
        scorer.validate()?;
        Ok(scorer)
    }

    /// Reject malformed fingerprints before the scorer is ever used
    fn validate(&self) -> Result<(), EngineError> {
        for (disease, fp) in &self.knowledge_base {
            if fp.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(EngineError::InvalidInput(format!(
                    "knowledge base entry '{disease}' has invalid weights"
                )));
            }
            if !(0.0..=1.0).contains(&fp.threshold) {
                return Err(EngineError::InvalidInput(format!(
                    "knowledge base entry '{disease}' has threshold outside 0..=1"
                )));
            }
        }
        Ok(())
    }

    /// Score and rank candidate diagnoses for the given vitals.
    ///
    /// When nothing clears the noise floor, returns the "Healthy"
    /// sentinel rather than an empty payload.
    pub fn diagnose(&self, temperature: f64, activity: f64) -> DiagnosisResult {
        let temp_score = sigmoid(temperature - FEVER_PIVOT_C);
        // Lower activity means a higher score, maxed out at zero movement
        let activity_score = ((100.0 - activity) / 100.0).clamp(0.0, 1.0);

        let mut ranked: Vec<DiagnosisEntry> = self
            .knowledge_base
            .iter()
            .filter_map(|(disease, fp)| {
                let probability = temp_score * fp.weights[0] + activity_score * fp.weights[1];
                if probability <= NOISE_FLOOR {
                    return None;
                }
                Some(DiagnosisEntry {
                    disease: disease.clone(),
                    confidence: round2(probability * 100.0),
                    severity: if probability > fp.threshold {
                        Severity::Critical
                    } else {
                        Severity::Monitor
                    },
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        match ranked.first() {
            Some(top) => {
                let action = self
                    .actions
                    .get(&top.disease)
                    .cloned()
                    .unwrap_or_else(|| GENERIC_ACTION.to_string());
                DiagnosisResult {
                    disease: top.disease.clone(),
                    confidence: top.confidence,
                    action,
                    ranked,
                }
            }
            None => DiagnosisResult {
                ranked: Vec::new(),
                disease: "Healthy".to_string(),
                confidence: 100.0,
                action: "Vitals within normal range.".to_string(),
            },
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
