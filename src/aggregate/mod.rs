//! Bounded-cost statistics aggregation.
//!
//! Every facet is computed from a capped uniform sample rather than a
//! full corpus scan, and every store call carries the configured time
//! budget. Rates are estimates; the response metadata carries the sample
//! size so consumers can judge confidence. The exact full-scan path
//! lives in [`crate::snapshot`] and never runs on a request.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::calculate::buckets::{apply_min_support, summarize, BucketSpec, BucketStat};
use crate::calculate::duration::duration_minutes_checked;
use crate::calculate::matchups::{build_edges, top_edges, MatchupEdge, MatchupOrder};
use crate::calculate::{calculate_play_rate, mean_of_present};
use crate::config::StatsConfig;
use crate::models::{
    AgeUpTimes, CivAggregate, MapStat, MatchRecord, ParticipationRecord, PatchAggregate,
};
use crate::store::{Datastore, StoreError};

/// Computes live statistics from bounded samples.
#[derive(Clone)]
pub struct SamplingAggregator {
    store: Arc<dyn Datastore>,
    cfg: StatsConfig,
}

impl SamplingAggregator {
    pub fn new(store: Arc<dyn Datastore>, cfg: StatsConfig) -> Self {
        Self { store, cfg }
    }

    /// Join the sampled rows' matches into a game-id index.
    async fn match_index(
        &self,
        rows: &[ParticipationRecord],
    ) -> Result<HashMap<String, MatchRecord>, StoreError> {
        let mut ids: Vec<String> = rows.iter().map(|r| r.game_id.clone()).collect();
        ids.sort_unstable();
        ids.dedup();

        let matches = self
            .store
            .matches_by_ids(&ids, self.cfg.facet_budget())
            .await?;
        Ok(matches.into_iter().map(|m| (m.game_id.clone(), m)).collect())
    }

    /// Cross-civilization leaderboard, sorted best win rate first.
    ///
    /// Counts are sample-observed, not corpus totals. An optional ranked
    /// queue filter is applied after joining match records, since the
    /// queue lives on the match, not the participation.
    pub async fn civ_summary(
        &self,
        leaderboard_id: Option<u32>,
    ) -> Result<Vec<CivAggregate>, StoreError> {
        let mut rows = self
            .store
            .sample_participations(None, self.cfg.totals_sample, self.cfg.facet_budget())
            .await?;

        if let Some(wanted) = leaderboard_id {
            let matches = self.match_index(&rows).await?;
            rows.retain(|r| {
                matches
                    .get(&r.game_id)
                    .map(|m| m.leaderboard_id == Some(wanted))
                    .unwrap_or(false)
            });
        }

        let observed = rows.len() as u32;

        // civ_lower -> (display, wins, losses); first-seen casing wins.
        let mut tallies: HashMap<String, (String, u32, u32)> = HashMap::new();
        for row in &rows {
            let entry = tallies
                .entry(row.civ_lower.clone())
                .or_insert_with(|| (row.civ.clone(), 0, 0));
            if row.winner {
                entry.1 += 1;
            } else {
                entry.2 += 1;
            }
        }

        let mut aggregates: Vec<CivAggregate> = tallies
            .into_values()
            .map(|(display, wins, losses)| {
                CivAggregate::from_counts(display, wins, losses, observed)
            })
            .filter(|a| a.total_picks >= self.cfg.min_support)
            .collect();

        aggregates.sort_by(|a, b| {
            b.win_rate
                .partial_cmp(&a.win_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.civ.cmp(&b.civ))
        });

        debug!(civs = aggregates.len(), sample = observed, "civ summary");
        Ok(aggregates)
    }

    /// Headline totals for one civilization.
    ///
    /// Win rate, rating and timings come from the cohort sample; the play
    /// rate is computed from exact counts, which are cheap.
    pub async fn civ_totals(&self, civ_lower: &str) -> Result<CivAggregate, StoreError> {
        let budget = self.cfg.facet_budget();
        let rows = self
            .store
            .sample_participations(Some(civ_lower), self.cfg.totals_sample, budget)
            .await?;

        let display = rows
            .first()
            .map(|r| r.civ.clone())
            .unwrap_or_else(|| civ_lower.to_string());
        let wins = rows.iter().filter(|r| r.winner).count() as u32;
        let losses = rows.len() as u32 - wins;

        let cohort = self.store.count_participations(Some(civ_lower), budget).await?;
        let total = self.store.count_participations(None, budget).await?;
        let matches = self.match_index(&rows).await?;

        let mut aggregate = CivAggregate::from_counts(display, wins, losses, 0);
        aggregate.play_rate = calculate_play_rate(cohort as u32, total as u32);
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
        Ok(aggregate)
    }

    /// Win rate by rating bracket. Rows without a rating are skipped.
    pub async fn rating_buckets(&self, civ_lower: &str) -> Result<Vec<BucketStat>, StoreError> {
        let rows = self
            .store
            .sample_participations(Some(civ_lower), self.cfg.breakdown_sample, self.cfg.facet_budget())
            .await?;

        let observations: Vec<(f64, bool)> = rows
            .iter()
            .filter_map(|r| r.rating.map(|rating| (rating, r.winner)))
            .collect();

        Ok(apply_min_support(
            summarize(&BucketSpec::rating(), &observations),
            self.cfg.min_support,
        ))
    }

    /// Win rate by game length, unit-normalized per match.
    pub async fn duration_buckets(&self, civ_lower: &str) -> Result<Vec<BucketStat>, StoreError> {
        let rows = self
            .store
            .sample_participations(Some(civ_lower), self.cfg.breakdown_sample, self.cfg.facet_budget())
            .await?;
        let matches = self.match_index(&rows).await?;

        let observations: Vec<(f64, bool)> = rows
            .iter()
            .filter_map(|r| {
                matches
                    .get(&r.game_id)
                    .map(|m| (duration_minutes_checked(m.duration), r.winner))
            })
            .collect();

        Ok(apply_min_support(
            summarize(&BucketSpec::duration_minutes(), &observations),
            self.cfg.min_support,
        ))
    }

    /// Win rate by game patch, most-played patch first.
    pub async fn patch_breakdown(
        &self,
        civ_lower: &str,
    ) -> Result<Vec<PatchAggregate>, StoreError> {
        let rows = self
            .store
            .sample_participations(Some(civ_lower), self.cfg.breakdown_sample, self.cfg.facet_budget())
            .await?;
        let matches = self.match_index(&rows).await?;
        let sampled = rows.len() as u32;

        let mut tallies: HashMap<String, (u32, u32)> = HashMap::new();
        for row in &rows {
            if let Some(m) = matches.get(&row.game_id) {
                let entry = tallies.entry(m.patch.clone()).or_default();
                entry.0 += 1;
                if row.winner {
                    entry.1 += 1;
                }
            }
        }

        let mut patches: Vec<PatchAggregate> = tallies
            .into_iter()
            .filter(|(_, (games, _))| *games >= self.cfg.min_support)
            .map(|(patch, (games, wins))| PatchAggregate {
                patch,
                games,
                wins,
                win_rate: wins as f64 / games as f64,
                play_rate: calculate_play_rate(games, sampled),
            })
            .collect();

        patches.sort_by(|a, b| b.games.cmp(&a.games).then_with(|| a.patch.cmp(&b.patch)));
        Ok(patches)
    }

    /// Win rate by map, most-played map first.
    pub async fn map_performance(&self, civ_lower: &str) -> Result<Vec<MapStat>, StoreError> {
        let rows = self
            .store
            .sample_participations(Some(civ_lower), self.cfg.breakdown_sample, self.cfg.facet_budget())
            .await?;
        let matches = self.match_index(&rows).await?;

        let mut tallies: HashMap<String, (u32, u32)> = HashMap::new();
        for row in &rows {
            if let Some(m) = matches.get(&row.game_id) {
                let entry = tallies.entry(m.map.clone()).or_default();
                entry.0 += 1;
                if row.winner {
                    entry.1 += 1;
                }
            }
        }

        let mut maps: Vec<MapStat> = tallies
            .into_iter()
            .filter(|(_, (games, _))| *games >= self.cfg.min_support)
            .map(|(map, (games, wins))| MapStat::new(map, games, wins))
            .collect();

        maps.sort_by(|a, b| b.games.cmp(&a.games).then_with(|| a.map.cmp(&b.map)));
        Ok(maps)
    }

    /// Best- or worst-against matchup table for one civilization.
    pub async fn matchups(
        &self,
        civ_lower: &str,
        order: MatchupOrder,
    ) -> Result<Vec<MatchupEdge>, StoreError> {
        let budget = self.cfg.facet_budget();
        let focal_rows = self
            .store
            .sample_participations(Some(civ_lower), self.cfg.matchup_sample, budget)
            .await?;

        let mut ids: Vec<String> = focal_rows.iter().map(|r| r.game_id.clone()).collect();
        ids.sort_unstable();
        ids.dedup();
        let game_rows = self.store.participations_for_games(&ids, budget).await?;

        Ok(top_edges(
            build_edges(&focal_rows, &game_rows),
            order,
            self.cfg.min_support,
            self.cfg.matchup_table_len,
        ))
    }

    /// Sample cap used for a facet, surfaced in response metadata.
    pub fn sample_cap(&self, facet: Facet) -> usize {
        match facet {
            Facet::Totals => self.cfg.totals_sample,
            Facet::Breakdown => self.cfg.breakdown_sample,
            Facet::Matchup => self.cfg.matchup_sample,
        }
    }
}

/// Facet families sharing a sample cap.
#[derive(Debug, Clone, Copy)]
pub enum Facet {
    Totals,
    Breakdown,
    Matchup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use crate::store::CivName;

    /// In-memory store; "sampling" returns matching rows in order, capped.
    struct FakeStore {
        participations: Vec<ParticipationRecord>,
        matches: Vec<MatchRecord>,
        fail_with: Option<fn() -> StoreError>,
    }

    impl FakeStore {
        fn new(participations: Vec<ParticipationRecord>, matches: Vec<MatchRecord>) -> Self {
            Self {
                participations,
                matches,
                fail_with: None,
            }
        }

        fn failing(err: fn() -> StoreError) -> Self {
            Self {
                participations: Vec::new(),
                matches: Vec::new(),
                fail_with: Some(err),
            }
        }

        fn check(&self) -> Result<(), StoreError> {
            match self.fail_with {
                Some(err) => Err(err()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Datastore for FakeStore {
        async fn distinct_civ_names(&self, _: Duration) -> Result<Vec<CivName>, StoreError> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn sample_participations(
            &self,
            civ_lower: Option<&str>,
            cap: usize,
            _: Duration,
        ) -> Result<Vec<ParticipationRecord>, StoreError> {
            self.check()?;
            Ok(self
                .participations
                .iter()
                .filter(|r| civ_lower.map_or(true, |c| r.civ_lower == c))
                .take(cap)
                .cloned()
                .collect())
        }

        async fn count_participations(
            &self,
            civ_lower: Option<&str>,
            _: Duration,
        ) -> Result<u64, StoreError> {
            self.check()?;
            Ok(self
                .participations
                .iter()
                .filter(|r| civ_lower.map_or(true, |c| r.civ_lower == c))
                .count() as u64)
        }

        async fn matches_by_ids(
            &self,
            game_ids: &[String],
            _: Duration,
        ) -> Result<Vec<MatchRecord>, StoreError> {
            self.check()?;
            Ok(self
                .matches
                .iter()
                .filter(|m| game_ids.contains(&m.game_id))
                .cloned()
                .collect())
        }

        async fn participations_for_games(
            &self,
            game_ids: &[String],
            _: Duration,
        ) -> Result<Vec<ParticipationRecord>, StoreError> {
            self.check()?;
            Ok(self
                .participations
                .iter()
                .filter(|r| game_ids.contains(&r.game_id))
                .cloned()
                .collect())
        }
    }

    fn cfg() -> StatsConfig {
        StatsConfig {
            min_support: 1,
            ..StatsConfig::default()
        }
    }

    fn aggregator(store: FakeStore) -> SamplingAggregator {
        SamplingAggregator::new(Arc::new(store), cfg())
    }

    fn row(game: &str, civ: &str, winner: bool) -> ParticipationRecord {
        ParticipationRecord::new(game, civ, winner)
    }

    #[tokio::test]
    async fn test_summary_groups_casing_drift() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true),
                row("g2", "BRITONS", false),
                row("g3", "Franks", true),
            ],
            vec![],
        );

        let summary = aggregator(store).civ_summary(None).await.unwrap();
        assert_eq!(summary.len(), 2);

        let britons = summary.iter().find(|a| a.civ == "Britons").unwrap();
        assert_eq!(britons.total_picks, 2);
        assert_eq!(britons.wins, 1);
    }

    #[tokio::test]
    async fn test_summary_sorted_best_first() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true),
                row("g2", "Britons", false),
                row("g3", "Franks", true),
                row("g4", "Franks", true),
            ],
            vec![],
        );

        let summary = aggregator(store).civ_summary(None).await.unwrap();
        assert_eq!(summary[0].civ, "Franks");
        assert_eq!(summary[1].civ, "Britons");
    }

    #[tokio::test]
    async fn test_summary_min_support_suppression() {
        let mut rows = vec![row("g0", "Goths", true)];
        for i in 0..5 {
            rows.push(row(&format!("g{}", i + 1), "Britons", i % 2 == 0));
        }
        let store = FakeStore::new(rows, vec![]);

        let mut config = cfg();
        config.min_support = 2;
        let summary = SamplingAggregator::new(Arc::new(store), config)
            .civ_summary(None)
            .await
            .unwrap();

        assert!(summary.iter().all(|a| a.civ != "Goths"));
        assert!(summary.iter().any(|a| a.civ == "Britons"));
    }

    #[tokio::test]
    async fn test_summary_leaderboard_filter() {
        let store = FakeStore::new(
            vec![row("g1", "Britons", true), row("g2", "Franks", true)],
            vec![
                MatchRecord::new("g1", "Arabia", 1800.0).with_leaderboard(3),
                MatchRecord::new("g2", "Arena", 1800.0).with_leaderboard(4),
            ],
        );

        let summary = aggregator(store).civ_summary(Some(3)).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].civ, "Britons");
    }

    #[tokio::test]
    async fn test_totals_play_rate_from_exact_counts() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true),
                row("g2", "Britons", false),
                row("g3", "Franks", true),
                row("g4", "Goths", false),
            ],
            vec![
                MatchRecord::new("g1", "Arabia", 1800.0),
                MatchRecord::new("g2", "Arena", 2400.0),
            ],
        );

        let totals = aggregator(store).civ_totals("britons").await.unwrap();
        assert_eq!(totals.civ, "Britons");
        assert_eq!(totals.total_picks, 2);
        assert_eq!(totals.win_rate, 0.5);
        assert!((totals.play_rate - 0.5).abs() < 1e-9);
        // 30 and 40 minutes from seconds-encoded durations.
        assert!((totals.avg_duration_minutes.unwrap() - 35.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rating_buckets_skip_unrated_rows() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true).with_rating(900.0),
                row("g2", "Britons", false).with_rating(1100.0),
                row("g3", "Britons", true), // unrated
            ],
            vec![],
        );

        let buckets = aggregator(store).rating_buckets("britons").await.unwrap();
        let total: u32 = buckets.iter().map(|b| b.games).sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_duration_buckets_normalize_mixed_units() {
        // g1 in seconds (1500 s = 25 min), g2 in milliseconds
        // (150_000 ms = 2.5 min): both must land in minute brackets.
        let store = FakeStore::new(
            vec![row("g1", "Britons", true), row("g2", "Britons", false)],
            vec![
                MatchRecord::new("g1", "Arabia", 1500.0),
                MatchRecord::new("g2", "Arena", 150_000.0),
            ],
        );

        let buckets = aggregator(store).duration_buckets("britons").await.unwrap();
        let short = buckets.iter().find(|b| b.label == "<20").unwrap();
        assert_eq!(short.games, 1);
        let mid = buckets.iter().find(|b| b.label == "20-30").unwrap();
        assert_eq!(mid.games, 1);
    }

    #[tokio::test]
    async fn test_patch_breakdown_play_rate_over_sample() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true),
                row("g2", "Britons", true),
                row("g3", "Britons", false),
                row("g4", "Britons", false),
            ],
            vec![
                MatchRecord::new("g1", "Arabia", 1800.0).with_patch("101.102"),
                MatchRecord::new("g2", "Arabia", 1800.0).with_patch("101.102"),
                MatchRecord::new("g3", "Arabia", 1800.0).with_patch("101.102"),
                MatchRecord::new("g4", "Arena", 1800.0).with_patch("101.103"),
            ],
        );

        let patches = aggregator(store).patch_breakdown("britons").await.unwrap();
        assert_eq!(patches[0].patch, "101.102");
        assert_eq!(patches[0].games, 3);
        assert!((patches[0].play_rate - 0.75).abs() < 1e-9);
        assert!((patches[0].win_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_map_performance_sorted_by_games() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true),
                row("g2", "Britons", false),
                row("g3", "Britons", true),
            ],
            vec![
                MatchRecord::new("g1", "Arabia", 1800.0),
                MatchRecord::new("g2", "Arabia", 1800.0),
                MatchRecord::new("g3", "Arena", 1800.0),
            ],
        );

        let maps = aggregator(store).map_performance("britons").await.unwrap();
        assert_eq!(maps[0].map, "Arabia");
        assert_eq!(maps[0].games, 2);
        assert_eq!(maps[1].map, "Arena");
    }

    #[tokio::test]
    async fn test_matchups_dedup_per_game() {
        let store = FakeStore::new(
            vec![
                row("g1", "Britons", true).with_team(1),
                row("g1", "Franks", false).with_team(2),
                row("g1", "Franks", false).with_team(2),
                row("g2", "Britons", false).with_team(1),
                row("g2", "Franks", true).with_team(2),
            ],
            vec![],
        );

        let edges = aggregator(store)
            .matchups("britons", MatchupOrder::BestFirst)
            .await
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].opponent, "Franks");
        // Two games despite three Franks rows.
        assert_eq!(edges[0].games, 2);
        assert_eq!(edges[0].wins, 1);
    }

    #[tokio::test]
    async fn test_store_timeout_propagates() {
        let store = FakeStore::failing(|| StoreError::Timeout(Duration::from_secs(3)));
        let result = aggregator(store).civ_summary(None).await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_empty_corpus_yields_empty_summary() {
        let store = FakeStore::new(vec![], vec![]);
        assert!(aggregator(store).civ_summary(None).await.unwrap().is_empty());
    }
}
