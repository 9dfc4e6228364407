//! Head-to-head matchup matrices.
//!
//! In team games a single game can contain several participation rows for
//! the same opposing civilization. Counting each row would over-count the
//! game once per teammate sharing a civilization, so outcomes are first
//! collapsed to one per (game, opponent-civilization) pair, keeping the
//! first observed outcome.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::ParticipationRecord;

/// Win rate of a focal civilization against one opponent.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupEdge {
    pub opponent: String,
    pub games: u32,
    /// Focal-side wins, derived from opponent loss counts.
    pub wins: u32,
    pub win_rate: f64,
}

/// Sort order for a matchup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchupOrder {
    BestFirst,
    WorstFirst,
}

/// Build matchup edges for a focal civilization.
///
/// `focal_rows` are the focal civilization's own sampled participations;
/// `game_rows` are all participation rows for those games. An opponent row
/// is one on a different team (falling back to a different civilization
/// when team data is missing on either side). The focal win rate is
/// `1 - opponent win fraction`, computed from the opponents' own recorded
/// outcomes rather than inferred from the focal rows, which avoids sign
/// errors when a team game has several opponents.
pub fn build_edges(
    focal_rows: &[ParticipationRecord],
    game_rows: &[ParticipationRecord],
) -> Vec<MatchupEdge> {
    let focal_civ = match focal_rows.first() {
        Some(row) => row.civ_lower.clone(),
        None => return Vec::new(),
    };
    let focal_team: HashMap<&str, Option<u32>> = focal_rows
        .iter()
        .map(|r| (r.game_id.as_str(), r.team))
        .collect();

    // One outcome per (game, opponent civ), first observed wins.
    let mut first_seen: HashMap<(String, String), bool> = HashMap::new();
    // Display casing for each opponent key.
    let mut display: HashMap<String, String> = HashMap::new();

    for row in game_rows {
        let Some(&team) = focal_team.get(row.game_id.as_str()) else {
            continue;
        };
        if row.civ_lower == focal_civ {
            continue;
        }
        let is_opponent = match (team, row.team) {
            (Some(ft), Some(ot)) => ft != ot,
            _ => true,
        };
        if !is_opponent {
            continue;
        }

        first_seen
            .entry((row.game_id.clone(), row.civ_lower.clone()))
            .or_insert(row.winner);
        display
            .entry(row.civ_lower.clone())
            .or_insert_with(|| row.civ.clone());
    }

    // opponent -> (games, opponent wins)
    let mut tallies: HashMap<String, (u32, u32)> = HashMap::new();
    for ((_, opponent), opponent_won) in first_seen {
        let entry = tallies.entry(opponent).or_default();
        entry.0 += 1;
        if opponent_won {
            entry.1 += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(key, (games, opponent_wins))| {
            let wins = games - opponent_wins;
            MatchupEdge {
                opponent: display.get(&key).cloned().unwrap_or(key),
                games,
                wins,
                win_rate: if games > 0 {
                    wins as f64 / games as f64
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Filter sparse edges, sort, and cap the table length.
pub fn top_edges(
    mut edges: Vec<MatchupEdge>,
    order: MatchupOrder,
    min_support: u32,
    limit: usize,
) -> Vec<MatchupEdge> {
    edges.retain(|e| e.games >= min_support);
    edges.sort_by(|a, b| {
        let cmp = a
            .win_rate
            .partial_cmp(&b.win_rate)
            .unwrap_or(std::cmp::Ordering::Equal);
        match order {
            MatchupOrder::BestFirst => cmp.reverse(),
            MatchupOrder::WorstFirst => cmp,
        }
        .then_with(|| b.games.cmp(&a.games))
    });
    edges.truncate(limit);
    edges
}
