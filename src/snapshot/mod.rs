//! Snapshot cache of rolled-up statistics.
//!
//! Snapshots are materialized out-of-band by the `snapshot` subcommand
//! and consulted before any live aggregation is attempted. The request
//! path only reads them, and may opportunistically write one back after a
//! successful live computation; that write-back is best-effort.

use std::collections::HashMap;

use tracing::info;

use crate::calculate::duration::duration_minutes_checked;
use crate::calculate::{calculate_play_rate, mean_of_present};
use crate::models::{
    AgeUpTimes, CacheEntry, CivAggregate, MapStat, MatchRecord, ParticipationRecord, CIV_ROSTER,
};
use crate::resolve::NameIndex;
use crate::storage::{EntityType, JsonlReader, JsonlWriter, StorageConfig, StorageError};

const CIV_AGGREGATES_FILE: &str = "civ_aggregates.jsonl";
const MAP_STATS_FILE: &str = "map_stats.jsonl";

/// Read/upsert access to the derived snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    storage: StorageConfig,
}

impl SnapshotStore {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    fn civ_path(&self) -> std::path::PathBuf {
        self.storage.derived_dir().join(CIV_AGGREGATES_FILE)
    }

    fn map_path(&self) -> std::path::PathBuf {
        self.storage.derived_dir().join(MAP_STATS_FILE)
    }

    /// All cached per-civilization aggregates.
    pub fn all_civ_aggregates(&self) -> Result<Vec<CacheEntry<CivAggregate>>, StorageError> {
        JsonlReader::new(self.civ_path()).read_all()
    }

    /// Cached aggregate for one civilization, if present.
    pub fn civ_aggregate(
        &self,
        civ: &str,
    ) -> Result<Option<CacheEntry<CivAggregate>>, StorageError> {
        Ok(self
            .all_civ_aggregates()?
            .into_iter()
            .find(|entry| entry.key == civ))
    }

    /// Insert or replace one civilization's aggregate.
    pub fn upsert_civ_aggregate(&self, aggregate: CivAggregate) -> Result<(), StorageError> {
        let mut entries = self.all_civ_aggregates()?;
        entries.retain(|e| e.key != aggregate.civ);
        entries.push(CacheEntry::new(aggregate.civ.clone(), aggregate));
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        JsonlWriter::new(self.civ_path()).write_all(&entries)?;
        Ok(())
    }

    /// Replace the whole per-civilization table in one pass.
    pub fn replace_civ_aggregates(
        &self,
        aggregates: Vec<CivAggregate>,
    ) -> Result<usize, StorageError> {
        let mut entries: Vec<CacheEntry<CivAggregate>> = aggregates
            .into_iter()
            .map(|a| CacheEntry::new(a.civ.clone(), a))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        JsonlWriter::new(self.civ_path()).write_all(&entries)
    }

    /// Cached per-map stats for one civilization, if present.
    pub fn map_stats(&self, civ: &str) -> Result<Option<CacheEntry<Vec<MapStat>>>, StorageError> {
        let entries: Vec<CacheEntry<Vec<MapStat>>> =
            JsonlReader::new(self.map_path()).read_all()?;
        Ok(entries.into_iter().find(|entry| entry.key == civ))
    }

    /// Insert or replace one civilization's per-map stats.
    pub fn upsert_map_stats(&self, civ: &str, stats: Vec<MapStat>) -> Result<(), StorageError> {
        let mut entries: Vec<CacheEntry<Vec<MapStat>>> =
            JsonlReader::new(self.map_path()).read_all()?;
        entries.retain(|e| e.key != civ);
        entries.push(CacheEntry::new(civ, stats));
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        JsonlWriter::new(self.map_path()).write_all(&entries)?;
        Ok(())
    }
}

/// Result of a full exact snapshot rebuild.
#[derive(Debug)]
pub struct SnapshotBuild {
    pub civ_aggregates: Vec<CivAggregate>,
    pub map_stats: HashMap<String, Vec<MapStat>>,
}

/// Compute exact per-civilization and per-map aggregates with a full
/// corpus scan. This is the scheduled refresh path, never the request
/// path.
pub fn build_snapshots(storage: &StorageConfig) -> Result<SnapshotBuild, StorageError> {
    let participations: Vec<ParticipationRecord> =
        JsonlReader::for_entity(storage, EntityType::Participation)
            .read_all()?
            .into_iter()
            .map(ParticipationRecord::normalized)
            .collect();
    let matches: HashMap<String, MatchRecord> =
        JsonlReader::for_entity(storage, EntityType::Match)
            .read_all()?
            .into_iter()
            .map(|m: MatchRecord| (m.game_id.clone(), m))
            .collect();

    let total_picks = participations.len() as u32;

    // civ_lower -> rows, merging casing drift into one cohort.
    let mut cohorts: HashMap<String, Vec<&ParticipationRecord>> = HashMap::new();
    for row in &participations {
        cohorts.entry(row.civ_lower.clone()).or_default().push(row);
    }

    let mut civ_aggregates = Vec::with_capacity(cohorts.len());
    let mut map_stats = HashMap::with_capacity(cohorts.len());

    // Snapshot keys must match what the resolver hands the request path,
    // so prefer the roster casing over whatever was ingested first.
    let roster = NameIndex::from_names(CIV_ROSTER.iter().copied());

    for rows in cohorts.into_values() {
        let display = roster
            .resolve(&rows[0].civ)
            .unwrap_or_else(|_| rows[0].civ.clone());
        let wins = rows.iter().filter(|r| r.winner).count() as u32;
        let losses = rows.len() as u32 - wins;

        let mut aggregate = CivAggregate::from_counts(display.clone(), wins, losses, 0);
        aggregate.play_rate = calculate_play_rate(rows.len() as u32, total_picks);
        aggregate.avg_rating = mean_of_present(rows.iter().map(|r| r.rating));
        aggregate.avg_duration_minutes = mean_of_present(rows.iter().map(|r| {
            matches
                .get(&r.game_id)
                .map(|m| duration_minutes_checked(m.duration))
        }));
        aggregate.age_up_times = AgeUpTimes {
            feudal: mean_of_present(rows.iter().map(|r| r.feudal_age_minutes)),
            castle: mean_of_present(rows.iter().map(|r| r.castle_age_minutes)),
            imperial: mean_of_present(rows.iter().map(|r| r.imperial_age_minutes)),
        };

        // Per-map tallies for this cohort.
        let mut per_map: HashMap<String, (u32, u32)> = HashMap::new();
        for row in &rows {
            if let Some(m) = matches.get(&row.game_id) {
                let entry = per_map.entry(m.map.clone()).or_default();
                entry.0 += 1;
                if row.winner {
                    entry.1 += 1;
                }
            }
        }
        let mut maps: Vec<MapStat> = per_map
            .into_iter()
            .map(|(map, (games, wins))| MapStat::new(map, games, wins))
            .collect();
        maps.sort_by(|a, b| b.games.cmp(&a.games));

        map_stats.insert(display.clone(), maps);
        civ_aggregates.push(aggregate);
    }

    civ_aggregates.sort_by(|a, b| a.civ.cmp(&b.civ));
    info!(
        civs = civ_aggregates.len(),
        picks = total_picks,
        "built exact snapshots"
    );

    Ok(SnapshotBuild {
        civ_aggregates,
        map_stats,
    })
}

/// Rebuild and persist all snapshots.
pub fn rebuild_and_store(storage: &StorageConfig) -> Result<usize, StorageError> {
    let build = build_snapshots(storage)?;
    let store = SnapshotStore::new(storage.clone());
    let count = store.replace_civ_aggregates(build.civ_aggregates)?;
    for (civ, stats) in build.map_stats {
        store.upsert_map_stats(&civ, stats)?;
    }
    Ok(count)
}
