//! Route handlers.

pub mod civs;
pub mod health;
pub mod maps;
pub mod matchups;

use serde::Serialize;

use crate::resilience::Source;
use crate::store::StoreError;

use super::ApiError;

/// Estimate-confidence metadata attached to every statistics response.
#[derive(Debug, Serialize)]
pub struct Meta {
    /// Maximum rows the underlying sample may have drawn.
    pub sample_cap: usize,
    /// Sparse groups below this observation count were suppressed.
    pub min_support: u32,
    pub source: Source,
    pub degraded: bool,
}

/// Collapse a secondary facet to empty on a recoverable failure.
///
/// Returns the facet payload and whether it was degraded; unrecoverable
/// errors still fail the whole request.
pub(super) fn facet_or_empty<T>(result: Result<Vec<T>, StoreError>) -> Result<(Vec<T>, bool), ApiError> {
    match result {
        Ok(items) => Ok((items, false)),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(error = %err, "facet degraded to empty");
            Ok((Vec::new(), true))
        }
        Err(err) => Err(err.into()),
    }
}
