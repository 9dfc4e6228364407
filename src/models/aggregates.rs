//! Derived statistics models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Average age-up timings for a cohort, in minutes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgeUpTimes {
    pub feudal: Option<f64>,
    pub castle: Option<f64>,
    pub imperial: Option<f64>,
}

/// Rolled-up per-civilization statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivAggregate {
    /// Canonical civilization name.
    pub civ: String,

    /// Picks observed (exact for snapshots, sample count for live queries).
    pub total_picks: u32,

    /// Wins among the observed picks.
    pub wins: u32,

    /// Losses among the observed picks.
    pub losses: u32,

    /// Win rate (0.0 to 1.0).
    pub win_rate: f64,

    /// This civilization's share of all observed picks.
    pub play_rate: f64,

    /// Average pre-game rating of players picking this civilization.
    pub avg_rating: Option<f64>,

    /// Average game length in minutes, unit-normalized.
    pub avg_duration_minutes: Option<f64>,

    /// Average age-up timings.
    pub age_up_times: AgeUpTimes,
}

impl CivAggregate {
    /// Build an aggregate from observed counts, deriving the rates.
    pub fn from_counts(civ: String, wins: u32, losses: u32, total_observed: u32) -> Self {
        let total_picks = wins + losses;
        let win_rate = if total_picks > 0 {
            wins as f64 / total_picks as f64
        } else {
            0.0
        };
        let play_rate = if total_observed > 0 {
            total_picks as f64 / total_observed as f64
        } else {
            0.0
        };

        Self {
            civ,
            total_picks,
            wins,
            losses,
            win_rate,
            play_rate,
            avg_rating: None,
            avg_duration_minutes: None,
            age_up_times: AgeUpTimes::default(),
        }
    }

    /// Neutral placeholder used as the last rung of the fallback ladder.
    pub fn placeholder(civ: String) -> Self {
        Self::from_counts(civ, 0, 0, 0)
    }
}

/// Per-map performance for one civilization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapStat {
    pub map: String,
    pub games: u32,
    pub wins: u32,
    pub win_rate: f64,
}

impl MapStat {
    pub fn new(map: String, games: u32, wins: u32) -> Self {
        let win_rate = if games > 0 {
            wins as f64 / games as f64
        } else {
            0.0
        };
        Self {
            map,
            games,
            wins,
            win_rate,
        }
    }
}

/// Per-patch breakdown within one civilization's cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchAggregate {
    pub patch: String,
    pub games: u32,
    pub wins: u32,
    pub win_rate: f64,
    /// Share of the sampled cohort played on this patch.
    pub play_rate: f64,
}

/// A named, timestamped snapshot of a derived aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Lookup key (a canonical civilization name, or "summary").
    pub key: String,

    /// When the payload was computed.
    pub computed_at: DateTime<Utc>,

    /// The cached aggregate.
    pub data: T,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, data: T) -> Self {
        Self {
            key: key.into(),
            computed_at: Utc::now(),
            data,
        }
    }

    /// Whether the entry is younger than `max_age`.
    pub fn is_fresh(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.computed_at <= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civ_aggregate_from_counts() {
        let agg = CivAggregate::from_counts("Britons".to_string(), 60, 40, 500);

        assert_eq!(agg.total_picks, 100);
        assert_eq!(agg.wins, 60);
        assert_eq!(agg.losses, 40);
        assert!((agg.win_rate - 0.6).abs() < 1e-9);
        assert!((agg.play_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_civ_aggregate_invariants() {
        let agg = CivAggregate::from_counts("Franks".to_string(), 55, 45, 1000);
        assert!(agg.win_rate >= 0.0 && agg.win_rate <= 1.0);
        assert!(agg.wins <= agg.total_picks);
    }

    #[test]
    fn test_civ_aggregate_zero_games() {
        let agg = CivAggregate::from_counts("Huns".to_string(), 0, 0, 0);
        assert_eq!(agg.win_rate, 0.0);
        assert_eq!(agg.play_rate, 0.0);
    }

    #[test]
    fn test_placeholder_is_neutral() {
        let agg = CivAggregate::placeholder("Goths".to_string());
        assert_eq!(agg.total_picks, 0);
        assert_eq!(agg.wins, 0);
        assert_eq!(agg.win_rate, 0.0);
    }

    #[test]
    fn test_map_stat_win_rate() {
        let stat = MapStat::new("Arabia".to_string(), 40, 22);
        assert!((stat.win_rate - 0.55).abs() < 1e-9);

        let empty = MapStat::new("Arena".to_string(), 0, 0);
        assert_eq!(empty.win_rate, 0.0);
    }

    #[test]
    fn test_cache_entry_freshness() {
        let mut entry = CacheEntry::new("Britons", 42u32);
        assert!(entry.is_fresh(chrono::Duration::hours(24)));

        entry.computed_at = Utc::now() - chrono::Duration::hours(48);
        assert!(!entry.is_fresh(chrono::Duration::hours(24)));
    }

    #[test]
    fn test_cache_entry_serialization() {
        let entry = CacheEntry::new(
            "Britons",
            CivAggregate::from_counts("Britons".to_string(), 10, 10, 100),
        );
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry<CivAggregate> = serde_json::from_str(&json).unwrap();

        assert_eq!(back.key, "Britons");
        assert_eq!(back.data.total_picks, 20);
    }
}
