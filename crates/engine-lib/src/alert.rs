//! Alert dispatch
//!
//! Turns a high-risk classification into an outbound notification through
//! a pluggable transport. Dispatch is best-effort: delivery failures are
//! logged and swallowed, and repeated alerts for the same animal and
//! reason are deduplicated within a configurable window so a feverish
//! animal does not page the farmer every few seconds.

use crate::models::{Alert, AlertChannel};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default deduplication window (15 minutes)
const DEFAULT_DEDUP_WINDOW_SECS: u64 = 15 * 60;

/// Why an alert fired; part of the deduplication key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    AnomalyDetected,
    CriticalVitals,
}

impl std::fmt::Display for AlertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertReason::AnomalyDetected => write!(f, "anomaly_detected"),
            AlertReason::CriticalVitals => write!(f, "critical_vitals"),
        }
    }
}

/// Delivery contract for a single notification channel
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<()>;
    fn channel(&self) -> AlertChannel;
}

/// Console transport: logs the alert through tracing
pub struct ConsoleTransport;

#[async_trait]
impl AlertTransport for ConsoleTransport {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        warn!(
            animal_id = %alert.animal_id,
            message = %alert.message,
            "ALERT"
        );
        Ok(())
    }

    fn channel(&self) -> AlertChannel {
        AlertChannel::Console
    }
}

/// Placeholder transport for channels without an integration yet
/// (SMS, WhatsApp, email). Accepts every alert and does nothing.
pub struct NoopTransport {
    channel: AlertChannel,
}

impl NoopTransport {
    pub fn new(channel: AlertChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl AlertTransport for NoopTransport {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        debug!(
            channel = %self.channel,
            animal_id = %alert.animal_id,
            "Channel not integrated, alert dropped"
        );
        Ok(())
    }

    fn channel(&self) -> AlertChannel {
        self.channel
    }
}

/// Build the transport for a configured channel
pub fn transport_for(channel: AlertChannel) -> Arc<dyn AlertTransport> {
    match channel {
        AlertChannel::Console => Arc::new(ConsoleTransport),
        other => Arc::new(NoopTransport::new(other)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    animal_id: String,
    reason: AlertReason,
}

/// Dispatches alerts with per-(animal, reason) deduplication
pub struct AlertDispatcher {
    transport: Arc<dyn AlertTransport>,
    dedup_window: Duration,
    recent: RwLock<HashMap<DedupKey, Instant>>,
}

impl AlertDispatcher {
    pub fn new(transport: Arc<dyn AlertTransport>) -> Self {
        Self {
            transport,
            dedup_window: Duration::from_secs(DEFAULT_DEDUP_WINDOW_SECS),
            recent: RwLock::new(HashMap::new()),
        }
    }

    /// Set a custom deduplication window
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Dispatch an alert, best-effort. Returns true when the alert was
    /// handed to the transport, false when deduplication suppressed it.
    /// Never fails and never blocks the calling classification.
    pub async fn dispatch(&self, animal_id: &str, reason: AlertReason, message: &str) -> bool {
        let key = DedupKey {
            animal_id: animal_id.to_string(),
            reason,
        };

        {
            let recent = self.recent.read().unwrap_or_else(|e| e.into_inner());
            if let Some(last) = recent.get(&key) {
                if last.elapsed() < self.dedup_window {
                    debug!(animal_id, %reason, "Alert suppressed by dedup window");
                    return false;
                }
            }
        }

        let alert = Alert {
            animal_id: animal_id.to_string(),
            message: message.to_string(),
            channel: self.transport.channel(),
        };

        if let Err(e) = self.transport.deliver(&alert).await {
            // Delivery is the transport's problem; classification goes on
            warn!(animal_id, %reason, error = %e, "Alert delivery failed");
        } else {
            info!(animal_id, %reason, channel = %alert.channel, "Alert dispatched");
        }

        let mut recent = self.recent.write().unwrap_or_else(|e| e.into_inner());
        recent.insert(key, Instant::now());
        recent.retain(|_, t| t.elapsed() < self.dedup_window);
        true
    }
}
