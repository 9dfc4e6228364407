//! Match-level records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record per game, owned by the ingestion pipeline.
///
/// `duration` is stored at whatever magnitude the ingesting revision used
/// (seconds, milliseconds, microseconds or nanoseconds); see
/// [`crate::calculate::duration`] for the conversion rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Game identifier, unique within the corpus.
    pub game_id: String,

    /// Map name as ingested.
    pub map: String,

    /// Raw game duration, unit unknown.
    pub duration: f64,

    /// Average pre-game rating across all players.
    pub avg_rating: Option<f64>,

    /// Patch/version identifier, e.g. "101.102.30274".
    pub patch: String,

    /// Ranked ladder this game was played on.
    pub leaderboard_id: Option<u32>,

    /// Number of players in the game.
    pub num_players: u32,

    /// Game start time.
    pub started_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(game_id: impl Into<String>, map: impl Into<String>, duration: f64) -> Self {
        Self {
            game_id: game_id.into(),
            map: map.into(),
            duration,
            avg_rating: None,
            patch: String::new(),
            leaderboard_id: None,
            num_players: 2,
            started_at: Utc::now(),
        }
    }

    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = patch.into();
        self
    }

    pub fn with_avg_rating(mut self, rating: f64) -> Self {
        self.avg_rating = Some(rating);
        self
    }

    pub fn with_leaderboard(mut self, leaderboard_id: u32) -> Self {
        self.leaderboard_id = Some(leaderboard_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_record_builders() {
        let m = MatchRecord::new("g1", "Arabia", 2400.0)
            .with_patch("101.102")
            .with_avg_rating(1150.0)
            .with_leaderboard(3);

        assert_eq!(m.game_id, "g1");
        assert_eq!(m.map, "Arabia");
        assert_eq!(m.patch, "101.102");
        assert_eq!(m.avg_rating, Some(1150.0));
        assert_eq!(m.leaderboard_id, Some(3));
    }

    #[test]
    fn test_match_record_serialization() {
        let m = MatchRecord::new("g1", "Arabia", 2400.0).with_patch("101.102");
        let json = serde_json::to_string(&m).unwrap();
        let back: MatchRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.game_id, m.game_id);
        assert_eq!(back.duration, m.duration);
        assert_eq!(back.patch, m.patch);
    }
}
