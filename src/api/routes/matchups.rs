use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::aggregate::Facet;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::matchups::{MatchupEdge, MatchupOrder};
use crate::resilience::Source;

use super::{facet_or_empty, Meta};

#[derive(Debug, Serialize)]
pub struct MatchupResponse {
    pub civilization: String,
    pub opponents: Vec<MatchupEdge>,
    pub meta: Meta,
}

async fn matchup_table(
    state: AppState,
    name: String,
    order: MatchupOrder,
) -> Result<Json<MatchupResponse>, ApiError> {
    let canonical = state.resolver.resolve(&name)?;
    let civ_lower = canonical.to_lowercase();

    // Matchup tables have no snapshot rung; a recoverable failure
    // degrades to an empty table.
    let (opponents, degraded) = facet_or_empty(state.aggregator.matchups(&civ_lower, order).await)?;

    Ok(Json(MatchupResponse {
        civilization: canonical,
        opponents,
        meta: Meta {
            sample_cap: state.aggregator.sample_cap(Facet::Matchup),
            min_support: state.stats.min_support,
            source: Source::Live,
            degraded,
        },
    }))
}

pub async fn best_against(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MatchupResponse>, ApiError> {
    matchup_table(state, name, MatchupOrder::BestFirst).await
}

pub async fn worst_against(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MatchupResponse>, ApiError> {
    matchup_table(state, name, MatchupOrder::WorstFirst).await
}
