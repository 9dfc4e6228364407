//! Data-store access.
//!
//! The aggregation engine talks to the match corpus through the
//! [`Datastore`] trait: filter, capped random sample, join-on-key and
//! count, every call under an explicit time budget. The production
//! implementation reads the JSONL data lake; tests inject fakes.

mod jsonl_store;

pub use jsonl_store::JsonlStore;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use crate::models::{MatchRecord, ParticipationRecord};
use crate::storage::StorageError;

/// Errors surfaced by bounded queries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The query exceeded its time budget. Recoverable: callers fall back
    /// one rung rather than retrying into the same load.
    #[error("query exceeded its {0:?} budget")]
    Timeout(Duration),

    /// The data store itself is unreachable. Fatal for the request.
    #[error("datastore unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    /// Whether the fallback ladder may absorb this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

/// A distinct civilization name observed in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CivName {
    pub name: String,
    /// Whether any record carried the lower-cased shadow field for it.
    pub has_shadow: bool,
}

/// Read-only query capability over the match corpus.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Distinct civilization names, for seeding the resolver index.
    async fn distinct_civ_names(&self, budget: Duration) -> Result<Vec<CivName>, StoreError>;

    /// Uniform random sample of participation rows, optionally restricted
    /// to one civilization cohort, capped at `cap` rows.
    async fn sample_participations(
        &self,
        civ_lower: Option<&str>,
        cap: usize,
        budget: Duration,
    ) -> Result<Vec<ParticipationRecord>, StoreError>;

    /// Exact participation count, optionally restricted to one cohort.
    async fn count_participations(
        &self,
        civ_lower: Option<&str>,
        budget: Duration,
    ) -> Result<u64, StoreError>;

    /// Match records for the given game identifiers. Only ever called
    /// with an already-sampled id set, keeping join cost bounded.
    async fn matches_by_ids(
        &self,
        game_ids: &[String],
        budget: Duration,
    ) -> Result<Vec<MatchRecord>, StoreError>;

    /// All participation rows belonging to the given games.
    async fn participations_for_games(
        &self,
        game_ids: &[String],
        budget: Duration,
    ) -> Result<Vec<ParticipationRecord>, StoreError>;
}

/// Reservoir-sample up to `cap` items from a stream of unknown length.
///
/// Single pass, O(cap) memory, uniform over the stream.
pub fn reservoir_sample<T, I, R>(items: I, cap: usize, rng: &mut R) -> Vec<T>
where
    I: Iterator<Item = T>,
    R: Rng,
{
    if cap == 0 {
        return Vec::new();
    }

    let mut sample: Vec<T> = Vec::with_capacity(cap);
    for (seen, item) in items.enumerate() {
        if sample.len() < cap {
            sample.push(item);
        } else {
            let slot = rng.gen_range(0..=seen);
            if slot < cap {
                sample[slot] = item;
            }
        }
    }
    sample
}
