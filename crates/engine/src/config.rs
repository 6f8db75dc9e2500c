//! Engine configuration

use anyhow::Result;
use engine_lib::context::EngineSettings;
use engine_lib::models::AlertChannel;
use serde::Deserialize;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Farm identifier attached to every structured log line
    #[serde(default = "default_farm_id")]
    pub farm_id: String,

    /// API server port for the engine endpoints and health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Growth model retraining interval in seconds
    #[serde(default = "default_retrain_interval")]
    pub retrain_interval_secs: u64,

    /// Market weight the forecast counts down to (kg)
    #[serde(default = "default_target_weight")]
    pub target_weight_kg: f64,

    /// Forecast horizon used when a request does not name one
    #[serde(default = "default_horizon_days")]
    pub default_horizon_days: u32,

    /// Outbound alert channel: console, sms, whatsapp or email
    #[serde(default = "default_alert_channel")]
    pub alert_channel: String,

    /// Fraction of sensor training data assumed to be outliers
    #[serde(default = "default_contamination")]
    pub contamination: f64,
}

fn default_farm_id() -> String {
    std::env::var("FARM_ID").unwrap_or_else(|_| "default".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_retrain_interval() -> u64 {
    24 * 60 * 60
}

fn default_target_weight() -> f64 {
    400.0
}

fn default_horizon_days() -> u32 {
    30
}

fn default_alert_channel() -> String {
    "console".to_string()
}

fn default_contamination() -> f64 {
    0.10
}

impl EngineConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ENGINE"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| EngineConfig {
            farm_id: default_farm_id(),
            api_port: default_api_port(),
            retrain_interval_secs: default_retrain_interval(),
            target_weight_kg: default_target_weight(),
            default_horizon_days: default_horizon_days(),
            alert_channel: default_alert_channel(),
            contamination: default_contamination(),
        }))
    }

    /// Resolve the settings the engine context is wired from
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            farm_id: self.farm_id.clone(),
            target_weight_kg: self.target_weight_kg,
            retrain_interval: Duration::from_secs(self.retrain_interval_secs),
            alert_channel: parse_channel(&self.alert_channel),
            contamination: self.contamination,
            ..EngineSettings::default()
        }
    }
}

/// Unrecognized channel names fall back to console rather than failing start
fn parse_channel(name: &str) -> AlertChannel {
    match name.to_ascii_lowercase().as_str() {
        "sms" => AlertChannel::Sms,
        "whatsapp" => AlertChannel::Whatsapp,
        "email" => AlertChannel::Email,
        _ => AlertChannel::Console,
    }
}
