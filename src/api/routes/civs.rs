use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::aggregate::Facet;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::buckets::BucketStat;
use crate::models::{CacheEntry, CivAggregate, PatchAggregate, CIV_ROSTER};
use crate::resilience::{self, Served, SnapshotState, Source};

use super::{facet_or_empty, Meta};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    /// Restrict to one ranked queue.
    pub leaderboard: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub civilizations: Vec<CivAggregate>,
    pub meta: Meta,
}

/// Neutral roster placeholders, the last rung when nothing else answers.
fn roster_placeholders() -> Vec<CivAggregate> {
    CIV_ROSTER
        .iter()
        .map(|name| CivAggregate::placeholder(name.to_string()))
        .collect()
}

/// Fold the per-civilization snapshot table into one ladder input.
///
/// The table is only as fresh as its oldest entry; a partially refreshed
/// table must not masquerade as fresh.
fn summary_snapshot_state(
    entries: Vec<CacheEntry<CivAggregate>>,
    max_age: chrono::Duration,
) -> SnapshotState<Vec<CivAggregate>> {
    let oldest = match entries.iter().map(|e| e.computed_at).min() {
        Some(ts) => ts,
        None => return SnapshotState::Missing,
    };

    let mut civs: Vec<CivAggregate> = entries.into_iter().map(|e| e.data).collect();
    civs.sort_by(|a, b| {
        b.win_rate
            .partial_cmp(&a.win_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.civ.cmp(&b.civ))
    });

    let mut entry = CacheEntry::new("summary", civs);
    entry.computed_at = oldest;
    SnapshotState::classify(Some(entry), max_age)
}

pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let meta = |served: &Served<Vec<CivAggregate>>| Meta {
        sample_cap: state.aggregator.sample_cap(Facet::Totals),
        min_support: state.stats.min_support,
        source: served.source,
        degraded: served.degraded,
    };

    // Filtered views never match a cached table; a recoverable failure
    // degrades to an empty list rather than a caller-visible error.
    if let Some(leaderboard_id) = params.leaderboard {
        let (civs, degraded) =
            facet_or_empty(state.aggregator.civ_summary(Some(leaderboard_id)).await)?;
        let served = Served {
            data: civs,
            source: Source::Live,
            degraded,
        };
        return Ok(Json(SummaryResponse {
            meta: meta(&served),
            civilizations: served.data,
        }));
    }

    let entries = state
        .snapshots
        .all_civ_aggregates()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let snapshot = summary_snapshot_state(entries, state.stats.snapshot_max_age());

    let aggregator = state.aggregator.clone();
    let served = resilience::serve(
        snapshot,
        || async move { aggregator.civ_summary(None).await },
        roster_placeholders,
    )
    .await?;

    Ok(Json(SummaryResponse {
        meta: meta(&served),
        civilizations: served.data,
    }))
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub civilization: CivAggregate,
    pub rating_buckets: Vec<BucketStat>,
    pub duration_buckets: Vec<BucketStat>,
    pub patches: Vec<PatchAggregate>,
    pub meta: DetailMeta,
}

/// Detail responses mix two sample shapes, so both caps are reported.
#[derive(Debug, Serialize)]
pub struct DetailMeta {
    /// Sample cap behind the headline totals.
    pub totals_cap: usize,
    /// Sample cap behind each breakdown facet.
    pub breakdown_cap: usize,
    pub min_support: u32,
    pub source: Source,
    pub degraded: bool,
}

pub async fn detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DetailResponse>, ApiError> {
    let canonical = state.resolver.resolve(&name)?;
    let civ_lower = canonical.to_lowercase();

    let entry = state
        .snapshots
        .civ_aggregate(&canonical)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let snapshot = SnapshotState::classify(entry, state.stats.snapshot_max_age());

    let aggregator = state.aggregator.clone();
    let cohort = civ_lower.clone();
    let placeholder_name = canonical.clone();
    let mut totals = resilience::serve(
        snapshot,
        || async move { aggregator.civ_totals(&cohort).await },
        move || CivAggregate::placeholder(placeholder_name),
    )
    .await?;
    // The resolver's casing wins over whatever the sample saw first.
    totals.data.civ = canonical.clone();

    // A live result refreshes the snapshot for the next request.
    if totals.source == Source::Live {
        let snapshots = state.snapshots.clone();
        let aggregate = totals.data.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = snapshots.upsert_civ_aggregate(aggregate) {
                tracing::warn!(error = %err, "snapshot write-back failed");
            }
        });
    }

    // Breakdown facets are live-only; each may degrade to empty on a
    // recoverable failure without failing the request.
    let (rating, duration, patches) = tokio::join!(
        state.aggregator.rating_buckets(&civ_lower),
        state.aggregator.duration_buckets(&civ_lower),
        state.aggregator.patch_breakdown(&civ_lower),
    );
    let (rating_buckets, rating_degraded) = facet_or_empty(rating)?;
    let (duration_buckets, duration_degraded) = facet_or_empty(duration)?;
    let (patches, patches_degraded) = facet_or_empty(patches)?;

    Ok(Json(DetailResponse {
        meta: DetailMeta {
            totals_cap: state.aggregator.sample_cap(Facet::Totals),
            breakdown_cap: state.aggregator.sample_cap(Facet::Breakdown),
            min_support: state.stats.min_support,
            source: totals.source,
            degraded: totals.degraded || rating_degraded || duration_degraded || patches_degraded,
        },
        civilization: totals.data,
        rating_buckets,
        duration_buckets,
        patches,
    }))
}
