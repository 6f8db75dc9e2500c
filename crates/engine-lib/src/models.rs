//! Core data models for the livestock engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered animal. Identity is immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    pub animal_id: String,
    pub species: String,
    pub birth_date: NaiveDate,
}

/// A single weight measurement, append-only and ordered by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightRecord {
    pub animal_id: String,
    /// Weight in kilograms, always positive
    pub weight_kg: f64,
    pub recorded_at: i64,
}

/// A single sensor reading (body temperature plus activity level).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    pub animal_id: String,
    pub temperature_c: f64,
    pub activity: f64,
    pub timestamp: i64,
}

/// One training pair for the global growth model: the animal's n-th
/// measurement maps sample index n to the observed weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub animal_id: String,
    pub sample_index: usize,
    pub weight_kg: f64,
}

/// How a forecast was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    /// Served from the published growth model
    Model,
    /// Average-daily-gain linear projection
    Fallback,
    /// Fewer than the minimum required samples
    InsufficientData,
}

/// Growth forecast for a single animal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub status: ForecastStatus,
    /// Predicted weights for the next `days_ahead` days, in order
    pub prediction: Vec<f64>,
    /// First 1-based day at which the target weight is reached, if any
    pub eta_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<u64>,
}

impl ForecastResult {
    pub fn insufficient_data() -> Self {
        Self {
            status: ForecastStatus::InsufficientData,
            prediction: Vec::new(),
            eta_days: None,
            model_version: None,
        }
    }
}

/// Risk tier produced by the health classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    MissingData,
}

/// Coarse health state accompanying the risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Normal,
    Warning,
    Alert,
    Unknown,
}

/// Classifier output, produced fresh per request and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub status: HealthState,
    pub risk: RiskLevel,
    pub message: String,
}

/// Sensor payload for a health classification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRequest {
    pub animal_id: String,
    pub temperature: Option<f64>,
    pub activity: Option<f64>,
}

/// Severity of a candidate diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Monitor,
    Critical,
}

/// One ranked candidate diagnosis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisEntry {
    pub disease: String,
    /// Confidence in percent, 0..=100
    pub confidence: f64,
    pub severity: Severity,
}

/// Diagnostic scorer output: ranked candidates plus the selected top
/// diagnosis with a recommended action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub ranked: Vec<DiagnosisEntry>,
    pub disease: String,
    pub confidence: f64,
    pub action: String,
}

/// Notification channel for outbound alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Console,
    Sms,
    Whatsapp,
    Email,
}

impl std::fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertChannel::Console => write!(f, "console"),
            AlertChannel::Sms => write!(f, "sms"),
            AlertChannel::Whatsapp => write!(f, "whatsapp"),
            AlertChannel::Email => write!(f, "email"),
        }
    }
}

/// An outbound alert. Fire-and-forget; delivery is the transport's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub animal_id: String,
    pub message: String,
    pub channel: AlertChannel,
}

/// Growth trend classification derived from the published model slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthTrend {
    Fast,
    Normal,
    Stalled,
    InsufficientData,
}

/// Qualitative confidence attached to a growth explanation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainConfidence {
    Low,
    Medium,
    High,
}

/// Human-oriented summary of an animal's growth behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthExplanation {
    pub trend: GrowthTrend,
    /// Estimated daily gain in kg/day (model slope)
    pub rate: f64,
    pub confidence: ExplainConfidence,
}
