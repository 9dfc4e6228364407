//! JSONL-backed [`Datastore`] implementation.
//!
//! File scans run on the blocking pool; the caller's budget bounds how
//! long a query is awaited, not the blocked read itself, so an overrun
//! fails closed rather than returning silently-truncated data.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::models::{MatchRecord, ParticipationRecord};
use crate::storage::{EntityType, JsonlReader, StorageConfig, StorageError};

use super::{reservoir_sample, CivName, Datastore, StoreError};

/// Reads the normalized JSONL data lake.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    storage: StorageConfig,
    /// Fixed RNG seed; set in tests for deterministic samples.
    sample_seed: Option<u64>,
}

impl JsonlStore {
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            sample_seed: None,
        }
    }

    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    fn rng(&self) -> SmallRng {
        match self.sample_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }

    async fn run_bounded<T, F>(&self, budget: Duration, task: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(task);
        match tokio::time::timeout(budget, handle).await {
            Err(_) => Err(StoreError::Timeout(budget)),
            Ok(Err(join_err)) => Err(StoreError::Unavailable(join_err.to_string())),
            Ok(Ok(result)) => result.map_err(StoreError::from),
        }
    }
}

fn participation_reader(storage: &StorageConfig) -> JsonlReader<ParticipationRecord> {
    JsonlReader::for_entity(storage, EntityType::Participation)
}

fn match_reader(storage: &StorageConfig) -> JsonlReader<MatchRecord> {
    JsonlReader::for_entity(storage, EntityType::Match)
}

#[async_trait]
impl Datastore for JsonlStore {
    async fn distinct_civ_names(&self, budget: Duration) -> Result<Vec<CivName>, StoreError> {
        let storage = self.storage.clone();
        self.run_bounded(budget, move || {
            // name -> has_shadow; first-seen casing wins.
            let mut seen: HashMap<String, bool> = HashMap::new();
            for record in participation_reader(&storage).iter()? {
                let record = record?;
                let has_shadow = !record.civ_lower.is_empty();
                let entry = seen.entry(record.civ).or_insert(has_shadow);
                *entry |= has_shadow;
            }

            let mut names: Vec<CivName> = seen
                .into_iter()
                .map(|(name, has_shadow)| CivName { name, has_shadow })
                .collect();
            names.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(names)
        })
        .await
    }

    async fn sample_participations(
        &self,
        civ_lower: Option<&str>,
        cap: usize,
        budget: Duration,
    ) -> Result<Vec<ParticipationRecord>, StoreError> {
        let storage = self.storage.clone();
        let civ_lower = civ_lower.map(str::to_string);
        let mut rng = self.rng();

        self.run_bounded(budget, move || {
            let rows = participation_reader(&storage)
                .iter()?
                .filter_map(|r| r.ok())
                .map(ParticipationRecord::normalized)
                .filter(|r| match &civ_lower {
                    Some(civ) => r.civ_lower == *civ,
                    None => true,
                });
            Ok(reservoir_sample(rows, cap, &mut rng))
        })
        .await
    }

    async fn count_participations(
        &self,
        civ_lower: Option<&str>,
        budget: Duration,
    ) -> Result<u64, StoreError> {
        let storage = self.storage.clone();
        let civ_lower = civ_lower.map(str::to_string);

        self.run_bounded(budget, move || {
            let count = participation_reader(&storage)
                .iter()?
                .filter_map(|r| r.ok())
                .map(ParticipationRecord::normalized)
                .filter(|r| match &civ_lower {
                    Some(civ) => r.civ_lower == *civ,
                    None => true,
                })
                .count();
            Ok(count as u64)
        })
        .await
    }

    async fn matches_by_ids(
        &self,
        game_ids: &[String],
        budget: Duration,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let storage = self.storage.clone();
        let wanted: HashSet<String> = game_ids.iter().cloned().collect();

        self.run_bounded(budget, move || {
            let matches = match_reader(&storage)
                .iter()?
                .filter_map(|r| r.ok())
                .filter(|m| wanted.contains(&m.game_id))
                .collect();
            Ok(matches)
        })
        .await
    }

    async fn participations_for_games(
        &self,
        game_ids: &[String],
        budget: Duration,
    ) -> Result<Vec<ParticipationRecord>, StoreError> {
        let storage = self.storage.clone();
        let wanted: HashSet<String> = game_ids.iter().cloned().collect();

        self.run_bounded(budget, move || {
            let rows = participation_reader(&storage)
                .iter()?
                .filter_map(|r| r.ok())
                .map(ParticipationRecord::normalized)
                .filter(|r| wanted.contains(&r.game_id))
                .collect();
            Ok(rows)
        })
        .await
    }
}
