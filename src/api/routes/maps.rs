use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::aggregate::Facet;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::MapStat;
use crate::resilience::{self, SnapshotState, Source};

use super::Meta;

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub civilization: String,
    pub maps: Vec<MapStat>,
    pub meta: Meta,
}

pub async fn map_performance(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MapResponse>, ApiError> {
    let canonical = state.resolver.resolve(&name)?;
    let civ_lower = canonical.to_lowercase();

    let entry = state
        .snapshots
        .map_stats(&canonical)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let snapshot = SnapshotState::classify(entry, state.stats.snapshot_max_age());

    let aggregator = state.aggregator.clone();
    let cohort = civ_lower.clone();
    let served = resilience::serve(
        snapshot,
        || async move { aggregator.map_performance(&cohort).await },
        Vec::new,
    )
    .await?;

    if served.source == Source::Live {
        let snapshots = state.snapshots.clone();
        let stats = served.data.clone();
        let key = canonical.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = snapshots.upsert_map_stats(&key, stats) {
                tracing::warn!(error = %err, "map snapshot write-back failed");
            }
        });
    }

    Ok(Json(MapResponse {
        civilization: canonical,
        meta: Meta {
            sample_cap: state.aggregator.sample_cap(Facet::Breakdown),
            min_support: state.stats.min_support,
            source: served.source,
            degraded: served.degraded,
        },
        maps: served.data,
    }))
}
