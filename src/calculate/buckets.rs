//! Histogram bucketing for continuous dimensions.
//!
//! A `BucketSpec` holds ascending boundary edges. Values between
//! consecutive edges land in a labeled range bucket; values below the
//! first edge land in a `<low` overflow bucket and values at or above the
//! last edge in a `high+` overflow bucket, so every finite value lands in
//! exactly one bucket and win-rate denominators are never silently biased.

use serde::Serialize;

/// Ordered boundary edges for one continuous dimension.
#[derive(Debug, Clone)]
pub struct BucketSpec {
    edges: Vec<f64>,
}

impl BucketSpec {
    /// Build a spec from ascending edges. At least two edges are required
    /// to form a range bucket.
    pub fn new(edges: Vec<f64>) -> Self {
        debug_assert!(edges.len() >= 2);
        debug_assert!(edges.windows(2).all(|w| w[0] < w[1]));
        Self { edges }
    }

    /// Default rating brackets.
    pub fn rating() -> Self {
        Self::new(vec![800.0, 1000.0, 1200.0, 1400.0, 1600.0])
    }

    /// Default game-length brackets, in minutes.
    pub fn duration_minutes() -> Self {
        Self::new(vec![20.0, 30.0, 40.0, 60.0])
    }

    /// Total number of buckets including both overflow ends.
    pub fn len(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the bucket a value lands in.
    pub fn index_of(&self, value: f64) -> usize {
        if value < self.edges[0] {
            return 0;
        }
        for (i, w) in self.edges.windows(2).enumerate() {
            if value >= w[0] && value < w[1] {
                return i + 1;
            }
        }
        self.edges.len()
    }

    /// Label for the bucket at `index`.
    pub fn label(&self, index: usize) -> String {
        if index == 0 {
            format!("<{}", fmt_edge(self.edges[0]))
        } else if index == self.edges.len() {
            format!("{}+", fmt_edge(self.edges[self.edges.len() - 1]))
        } else {
            format!(
                "{}-{}",
                fmt_edge(self.edges[index - 1]),
                fmt_edge(self.edges[index])
            )
        }
    }

    /// All labels, in bucket order.
    pub fn labels(&self) -> Vec<String> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }
}

fn fmt_edge(edge: f64) -> String {
    if edge.fract() == 0.0 {
        format!("{}", edge as i64)
    } else {
        format!("{}", edge)
    }
}

/// Per-bucket counts and derived rates.
///
/// `win_rate` is `None` for an empty bucket so consumers can distinguish
/// absence of data from a true 50% split.
#[derive(Debug, Clone, Serialize)]
pub struct BucketStat {
    pub label: String,
    pub games: u32,
    pub wins: u32,
    pub win_rate: Option<f64>,
    /// Share of the cohort total, not of any corpus-wide population.
    pub share: f64,
}

/// Summarize a cohort of (value, won) observations into per-bucket stats.
///
/// Every observation lands in exactly one bucket; the per-bucket counts
/// always sum to the cohort size. Empty buckets are retained with a
/// `None` win rate. Sparse-bucket suppression is a separate step, see
/// [`apply_min_support`].
pub fn summarize(spec: &BucketSpec, observations: &[(f64, bool)]) -> Vec<BucketStat> {
    let mut games = vec![0u32; spec.len()];
    let mut wins = vec![0u32; spec.len()];

    for &(value, won) in observations {
        let idx = spec.index_of(value);
        games[idx] += 1;
        if won {
            wins[idx] += 1;
        }
    }

    let total = observations.len() as f64;
    (0..spec.len())
        .map(|i| BucketStat {
            label: spec.label(i),
            games: games[i],
            wins: wins[i],
            win_rate: if games[i] > 0 {
                Some(wins[i] as f64 / games[i] as f64)
            } else {
                None
            },
            share: if total > 0.0 {
                games[i] as f64 / total
            } else {
                0.0
            },
        })
        .collect()
}

/// Drop buckets with fewer observations than `min_support`.
///
/// Too few observations produce win-rate estimates with unacceptable
/// variance; a bucket with exactly the threshold is kept.
pub fn apply_min_support(buckets: Vec<BucketStat>, min_support: u32) -> Vec<BucketStat> {
    buckets
        .into_iter()
        .filter(|b| b.games >= min_support)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> BucketSpec {
        BucketSpec::new(vec![800.0, 1000.0, 1200.0])
    }

    #[test]
    fn test_labels() {
        assert_eq!(spec().labels(), vec!["<800", "800-1000", "1000-1200", "1200+"]);
    }

    #[test]
    fn test_every_value_lands_in_exactly_one_bucket() {
        let s = spec();
        assert_eq!(s.index_of(500.0), 0);
        assert_eq!(s.index_of(800.0), 1);
        assert_eq!(s.index_of(999.9), 1);
        assert_eq!(s.index_of(1000.0), 2);
        assert_eq!(s.index_of(1200.0), 3);
        assert_eq!(s.index_of(9999.0), 3);
    }

    #[test]
    fn test_counts_sum_to_cohort_size() {
        let observations: Vec<(f64, bool)> = (0..257)
            .map(|i| (600.0 + (i as f64) * 7.0, i % 3 == 0))
            .collect();

        let buckets = summarize(&spec(), &observations);
        let total: u32 = buckets.iter().map(|b| b.games).sum();
        assert_eq!(total as usize, observations.len());
    }

    #[test]
    fn test_empty_bucket_win_rate_is_none() {
        let observations = vec![(900.0, true), (950.0, false)];
        let buckets = summarize(&spec(), &observations);

        // "<800" saw nothing.
        assert_eq!(buckets[0].games, 0);
        assert_eq!(buckets[0].win_rate, None);
        // "800-1000" saw both.
        assert_eq!(buckets[1].games, 2);
        assert_eq!(buckets[1].win_rate, Some(0.5));
    }

    #[test]
    fn test_share_is_relative_to_cohort() {
        let observations = vec![
            (900.0, true),
            (900.0, false),
            (1100.0, true),
            (1300.0, false),
        ];
        let buckets = summarize(&spec(), &observations);
        assert!((buckets[1].share - 0.5).abs() < 1e-9);
        assert!((buckets[2].share - 0.25).abs() < 1e-9);
        assert!((buckets[3].share - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_min_support_suppression() {
        let mut observations = vec![(900.0, true), (900.0, false), (950.0, true)];
        observations.extend(std::iter::repeat((1100.0, true)).take(4));

        let buckets = apply_min_support(summarize(&spec(), &observations), 4);

        // 3 observations in "800-1000" is below the threshold of 4.
        assert!(!buckets.iter().any(|b| b.label == "800-1000"));
        // Exactly 4 in "1000-1200" is kept.
        assert!(buckets.iter().any(|b| b.label == "1000-1200"));
    }

    #[test]
    fn test_summarize_empty_cohort() {
        let buckets = summarize(&spec(), &[]);
        assert_eq!(buckets.len(), 4);
        assert!(buckets.iter().all(|b| b.games == 0 && b.win_rate.is_none()));
        assert!(buckets.iter().all(|b| b.share == 0.0));
    }

    #[test]
    fn test_default_specs() {
        assert_eq!(BucketSpec::rating().labels()[0], "<800");
        assert_eq!(
            BucketSpec::duration_minutes().labels(),
            vec!["<20", "20-30", "30-40", "40-60", "60+"]
        );
    }
}
