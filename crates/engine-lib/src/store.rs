//! Data-access contract and in-memory implementation
//!
//! The engine never owns persistence. It consumes ordered read views
//! through [`DataAccess`] and treats the backing store as an opaque,
//! possibly-slow, possibly-failing collaborator. `MemoryStore` is the
//! reference implementation used by the service binary and by tests.

use crate::models::{Animal, SensorRecord, TrainingSample, WeightRecord};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Read/write contract the engine depends on.
///
/// All list operations return sequences ordered ascending by time.
#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn animal_exists(&self, animal_id: &str) -> Result<bool>;

    /// Ordered weight history for one animal, ascending by date
    async fn list_weight_history(&self, animal_id: &str) -> Result<Vec<WeightRecord>>;

    /// Ordered sensor history for one animal, ascending by timestamp
    async fn list_sensor_history(&self, animal_id: &str) -> Result<Vec<SensorRecord>>;

    /// Full weight table across all animals, as (animal, sample-index,
    /// weight) training pairs
    async fn list_all_weight_history(&self) -> Result<Vec<TrainingSample>>;

    /// All sensor readings across all animals, for anomaly training
    async fn list_all_sensor_history(&self) -> Result<Vec<SensorRecord>>;

    /// Register an animal. Re-registration of an existing id is a no-op,
    /// not an overwrite; returns false when the id already existed.
    async fn register_animal(&self, animal: Animal) -> Result<bool>;

    /// Append one weight measurement
    async fn add_weight(&self, record: WeightRecord) -> Result<()>;

    /// Append one sensor reading
    async fn add_sensor(&self, record: SensorRecord) -> Result<()>;
}

/// In-memory store keyed by animal id
#[derive(Debug, Default)]
pub struct MemoryStore {
    animals: DashMap<String, Animal>,
    weights: DashMap<String, Vec<WeightRecord>>,
    sensors: DashMap<String, Vec<SensorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animal_count(&self) -> usize {
        self.animals.len()
    }
}

#[async_trait]
impl DataAccess for MemoryStore {
    async fn animal_exists(&self, animal_id: &str) -> Result<bool> {
        Ok(self.animals.contains_key(animal_id))
    }

    async fn list_weight_history(&self, animal_id: &str) -> Result<Vec<WeightRecord>> {
        Ok(self
            .weights
            .get(animal_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }

    async fn list_sensor_history(&self, animal_id: &str) -> Result<Vec<SensorRecord>> {
        Ok(self
            .sensors
            .get(animal_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }

    async fn list_all_weight_history(&self) -> Result<Vec<TrainingSample>> {
        let mut samples = Vec::new();
        for entry in self.weights.iter() {
            for (idx, record) in entry.value().iter().enumerate() {
                samples.push(TrainingSample {
                    animal_id: entry.key().clone(),
                    sample_index: idx,
                    weight_kg: record.weight_kg,
                });
            }
        }
        Ok(samples)
    }

    async fn list_all_sensor_history(&self) -> Result<Vec<SensorRecord>> {
        let mut readings = Vec::new();
        for entry in self.sensors.iter() {
            readings.extend(entry.value().iter().cloned());
        }
        Ok(readings)
    }

    async fn register_animal(&self, animal: Animal) -> Result<bool> {
        if self.animals.contains_key(&animal.animal_id) {
            return Ok(false);
        }
        self.animals.insert(animal.animal_id.clone(), animal);
        Ok(true)
    }

    async fn add_weight(&self, record: WeightRecord) -> Result<()> {
        let mut history = self.weights.entry(record.animal_id.clone()).or_default();
        // Insert keeping ascending date order; late arrivals land in place
        let pos = history.partition_point(|r| r.recorded_at <= record.recorded_at);
        history.insert(pos, record);
        Ok(())
    }

    async fn add_sensor(&self, record: SensorRecord) -> Result<()> {
        let mut history = self.sensors.entry(record.animal_id.clone()).or_default();
        let pos = history.partition_point(|r| r.timestamp <= record.timestamp);
        history.insert(pos, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn test_animal(id: &str) -> Animal {
        Animal {
            animal_id: id.to_string(),
            species: "cattle".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_reregistration_is_noop() {
        let store = MemoryStore::new();
        assert!(store.register_animal(test_animal("COW-1")).await.unwrap());

        let mut second = test_animal("COW-1");
        second.species = "goat".to_string();
        assert!(!store.register_animal(second).await.unwrap());

        // Original record survives
        assert!(store.animal_exists("COW-1").await.unwrap());
        assert_eq!(store.animal_count(), 1);
    }

    #[tokio::test]
    async fn test_weight_history_stays_ordered() {
        let store = MemoryStore::new();
        store.register_animal(test_animal("COW-1")).await.unwrap();

        for (ts, kg) in [(300, 225.0), (100, 220.0), (200, 222.0)] {
            store
                .add_weight(WeightRecord {
                    animal_id: "COW-1".to_string(),
                    weight_kg: kg,
                    recorded_at: ts,
                })
                .await
                .unwrap();
        }

        let history = store.list_weight_history("COW-1").await.unwrap();
        let dates: Vec<i64> = history.iter().map(|r| r.recorded_at).collect();
        assert_eq!(dates, vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn test_training_pairs_use_per_animal_indices() {
        let store = MemoryStore::new();
        for id in ["COW-1", "COW-2"] {
            store.register_animal(test_animal(id)).await.unwrap();
            for i in 0..3 {
                store
                    .add_weight(WeightRecord {
                        animal_id: id.to_string(),
                        weight_kg: 200.0 + i as f64,
                        recorded_at: i,
                    })
                    .await
                    .unwrap();
            }
        }

        let samples = store.list_all_weight_history().await.unwrap();
        assert_eq!(samples.len(), 6);
        // Indices restart per animal
        let max_index = samples.iter().map(|s| s.sample_index).max().unwrap();
        assert_eq!(max_index, 2);
    }

    #[tokio::test]
    async fn test_unknown_animal_has_empty_history() {
        let store = MemoryStore::new();
        assert!(!store.animal_exists("ghost").await.unwrap());
        assert!(store.list_weight_history("ghost").await.unwrap().is_empty());
    }
}
