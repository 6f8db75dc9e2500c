//! Atomically-replaceable growth model store
//!
//! Holds at most one "current" model as an immutable snapshot behind a
//! pointer swap. Readers always observe either the old or the new model,
//! never a torn one; published artifacts are never mutated in place.

use super::regression::GrowthEstimator;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Lifecycle status of the published model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Fit on a full-sized dataset
    Trained,
    /// Fit on a dataset too small to trust beyond short horizons
    Stub,
    /// Newer data exists that the model has not seen
    Stale,
}

/// Metadata published alongside every model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: u64,
    pub trained_at: i64,
    pub sample_count: usize,
    pub status: ModelStatus,
    pub strategy: String,
    /// SHA-256 over the serialized parameter vector
    pub checksum: String,
}

/// An immutable published model snapshot
#[derive(Debug)]
pub struct PublishedModel {
    pub meta: ModelMetadata,
    pub estimator: Arc<dyn GrowthEstimator>,
}

/// Holds the currently-served growth model behind an atomic swap
#[derive(Debug, Default)]
pub struct ModelStore {
    current: RwLock<Option<Arc<PublishedModel>>>,
    next_version: AtomicU64,
}

impl ModelStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            next_version: AtomicU64::new(1),
        }
    }

    /// Snapshot of the current model, if one has been published.
    /// Cheap Arc clone; safe to hold across slow inference work.
    pub fn current(&self) -> Option<Arc<PublishedModel>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Metadata of the current model, if any
    pub fn current_meta(&self) -> Option<ModelMetadata> {
        self.current().map(|m| m.meta.clone())
    }

    /// Atomically publish a newly fitted estimator, replacing any
    /// previous model. In-flight readers keep serving their snapshot.
    pub fn publish(
        &self,
        estimator: Arc<dyn GrowthEstimator>,
        sample_count: usize,
        status: ModelStatus,
    ) -> ModelMetadata {
        let meta = ModelMetadata {
            version: self.next_version.fetch_add(1, Ordering::SeqCst),
            trained_at: Utc::now().timestamp(),
            sample_count,
            status,
            strategy: estimator.name().to_string(),
            checksum: checksum_params(&estimator.params()),
        };

        let published = Arc::new(PublishedModel {
            meta: meta.clone(),
            estimator,
        });

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(published);

        info!(
            version = meta.version,
            sample_count = meta.sample_count,
            status = ?meta.status,
            checksum = %meta.checksum,
            "Published growth model"
        );
        meta
    }

    /// Re-publish the current model flagged stale. Used when new data
    /// arrived but a retrain could not run; the artifact itself is reused
    /// unchanged.
    pub fn mark_stale(&self) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(model) = current.as_ref() {
            if model.meta.status == ModelStatus::Stale {
                return;
            }
            let mut meta = model.meta.clone();
            meta.status = ModelStatus::Stale;
            *current = Some(Arc::new(PublishedModel {
                meta,
                estimator: Arc::clone(&model.estimator),
            }));
        }
    }
}

/// SHA-256 checksum over the serialized parameter vector
fn checksum_params(params: &[f64]) -> String {
    let mut hasher = Sha256::new();
    let encoded = serde_json::to_vec(params).unwrap_or_default();
    hasher.update(&encoded);
    hex::encode(hasher.finalize())
}
