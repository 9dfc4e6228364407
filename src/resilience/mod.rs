//! Degradation ladder for statistics queries.
//!
//! Every query walks the same rungs: a fresh snapshot is served as-is, a
//! live computation runs when the snapshot is stale or missing, and a
//! recoverable live failure falls back to the stale snapshot or, failing
//! that, a static placeholder. Only recoverable failures are absorbed;
//! anything else propagates to the caller.

use std::future::Future;

use serde::Serialize;
use tracing::warn;

use crate::models::CacheEntry;
use crate::store::StoreError;

/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Snapshot,
    Live,
    Static,
}

/// A payload annotated with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Served<T> {
    pub data: T,
    pub source: Source,
    /// True when a lower rung answered than the caller asked for.
    pub degraded: bool,
}

impl<T> Served<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            source: Source::Live,
            degraded: false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        Served {
            data: f(self.data),
            source: self.source,
            degraded: self.degraded,
        }
    }
}

/// A snapshot lookup classified against the staleness window.
#[derive(Debug, Clone)]
pub enum SnapshotState<T> {
    Fresh(CacheEntry<T>),
    Stale(CacheEntry<T>),
    Missing,
}

impl<T> SnapshotState<T> {
    /// Classify an optional cache entry against `max_age`.
    pub fn classify(entry: Option<CacheEntry<T>>, max_age: chrono::Duration) -> Self {
        match entry {
            Some(e) if e.is_fresh(max_age) => SnapshotState::Fresh(e),
            Some(e) => SnapshotState::Stale(e),
            None => SnapshotState::Missing,
        }
    }
}

/// Serve a query through the ladder.
///
/// A fresh snapshot short-circuits without touching the live path. When
/// the live computation fails recoverably, a stale snapshot (then a
/// static placeholder) answers with `degraded` set. Unrecoverable errors
/// are returned untouched.
pub async fn serve<T, F, Fut>(
    snapshot: SnapshotState<T>,
    live: F,
    placeholder: impl FnOnce() -> T,
) -> Result<Served<T>, StoreError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let stale = match snapshot {
        SnapshotState::Fresh(entry) => {
            return Ok(Served {
                data: entry.data,
                source: Source::Snapshot,
                degraded: false,
            });
        }
        SnapshotState::Stale(entry) => Some(entry),
        SnapshotState::Missing => None,
    };

    match live().await {
        Ok(data) => Ok(Served::live(data)),
        Err(err) if err.is_recoverable() => match stale {
            Some(entry) => {
                warn!(key = %entry.key, error = %err, "live query failed, serving stale snapshot");
                Ok(Served {
                    data: entry.data,
                    source: Source::Snapshot,
                    degraded: true,
                })
            }
            None => {
                warn!(error = %err, "live query failed with no snapshot, serving placeholder");
                Ok(Served {
                    data: placeholder(),
                    source: Source::Static,
                    degraded: true,
                })
            }
        },
        Err(err) => Err(err),
    }
}
