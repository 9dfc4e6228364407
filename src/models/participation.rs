//! Per-player-per-game records.

use serde::{Deserialize, Serialize};

/// One record per (game, player).
///
/// `civ_lower` is a precomputed lower-cased shadow of `civ`, used as the
/// cheap case-insensitive access path. Records ingested before the shadow
/// field existed carry an empty string; [`ParticipationRecord::normalized`]
/// backfills it on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationRecord {
    /// Game identifier, joins against [`super::MatchRecord`].
    pub game_id: String,

    /// Civilization name as ingested (casing drifts across revisions).
    pub civ: String,

    /// Lower-cased shadow of `civ`; may be empty on legacy records.
    #[serde(default)]
    pub civ_lower: String,

    /// Team number within the game, when recorded.
    pub team: Option<u32>,

    /// Whether this player won the game.
    pub winner: bool,

    /// Pre-game rating, when recorded.
    pub rating: Option<f64>,

    /// Age-up timings in minutes, when recorded.
    pub feudal_age_minutes: Option<f64>,
    pub castle_age_minutes: Option<f64>,
    pub imperial_age_minutes: Option<f64>,

    /// Opening-strategy label, e.g. "scouts", "archers".
    pub opening: Option<String>,
}

impl ParticipationRecord {
    pub fn new(game_id: impl Into<String>, civ: impl Into<String>, winner: bool) -> Self {
        let civ = civ.into();
        let civ_lower = civ.to_lowercase();
        Self {
            game_id: game_id.into(),
            civ,
            civ_lower,
            team: None,
            winner,
            rating: None,
            feudal_age_minutes: None,
            castle_age_minutes: None,
            imperial_age_minutes: None,
            opening: None,
        }
    }

    pub fn with_team(mut self, team: u32) -> Self {
        self.team = Some(team);
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Legacy record without the shadow field.
    pub fn without_shadow(mut self) -> Self {
        self.civ_lower = String::new();
        self
    }

    /// Backfill the shadow field when a legacy record lacks it.
    pub fn normalized(mut self) -> Self {
        if self.civ_lower.is_empty() && !self.civ.is_empty() {
            self.civ_lower = self.civ.to_lowercase();
        }
        self
    }
}
