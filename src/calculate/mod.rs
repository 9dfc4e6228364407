//! Statistics calculation engine.
//!
//! Pure helpers shared by the sampling aggregator:
//! - Win-rate and play-rate arithmetic
//! - Duration unit inference
//! - Histogram bucketing
//! - Head-to-head matchup matrices

pub mod buckets;
pub mod duration;
pub mod matchups;

/// Calculate win rate from wins/losses.
pub fn calculate_win_rate(wins: u32, losses: u32) -> f64 {
    let total = wins + losses;
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64
    }
}

/// Calculate a cohort's share of a larger population.
pub fn calculate_play_rate(cohort: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        cohort as f64 / total as f64
    }
}

/// Mean of the present values, or `None` when nothing is present.
pub fn mean_of_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for v in values.into_iter().flatten() {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
