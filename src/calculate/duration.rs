//! Duration unit inference.
//!
//! The corpus mixes at least two historical duration encodings and carries
//! no per-record unit tag, so the unit is classified from the value's
//! magnitude. Thresholds are checked largest-first so no value is
//! double-converted.

use serde::Serialize;

/// Inferred encoding of a raw duration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Nanoseconds,
    Milliseconds,
    Seconds,
    Minutes,
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationUnit::Nanoseconds => write!(f, "nanoseconds"),
            DurationUnit::Milliseconds => write!(f, "milliseconds"),
            DurationUnit::Seconds => write!(f, "seconds"),
            DurationUnit::Minutes => write!(f, "minutes"),
        }
    }
}

/// Shortest game length considered realistic, in minutes.
pub const REALISTIC_MIN_MINUTES: f64 = 5.0;
/// Longest game length considered realistic, in minutes.
pub const REALISTIC_MAX_MINUTES: f64 = 120.0;

/// Classify a raw duration value's encoding from its magnitude.
pub fn classify(raw: f64) -> DurationUnit {
    if raw > 1e8 {
        DurationUnit::Nanoseconds
    } else if raw > 1e5 {
        DurationUnit::Milliseconds
    } else if raw > 1e3 {
        DurationUnit::Seconds
    } else {
        DurationUnit::Minutes
    }
}

/// Convert a raw duration value to minutes.
///
/// Pure and total: zero and negative inputs map to 0 minutes, NaN maps
/// to 0. Already-in-minutes values pass through unchanged, so converting
/// twice never re-classifies.
pub fn duration_minutes(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }

    match classify(raw) {
        DurationUnit::Nanoseconds => raw / 6e10,
        DurationUnit::Milliseconds => raw / 60_000.0,
        DurationUnit::Seconds => raw / 60.0,
        DurationUnit::Minutes => raw,
    }
}

/// Whether a converted duration falls in the realistic game-length range.
///
/// Used only as a diagnostic: out-of-range values are still converted with
/// the best-guess classification, never rejected.
pub fn is_realistic(minutes: f64) -> bool {
    (REALISTIC_MIN_MINUTES..=REALISTIC_MAX_MINUTES).contains(&minutes)
}

/// Convert to minutes, logging values the realistic-range heuristic
/// cannot vouch for.
pub fn duration_minutes_checked(raw: f64) -> f64 {
    let minutes = duration_minutes(raw);
    if raw > 0.0 && !is_realistic(minutes) {
        tracing::warn!(
            raw,
            minutes,
            unit = %classify(raw),
            "duration outside realistic range after unit inference"
        );
    }
    minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanoseconds_path() {
        assert_eq!(classify(150_000_000.0), DurationUnit::Nanoseconds);
        let minutes = duration_minutes(150_000_000.0);
        assert!((minutes - 150_000_000.0 / 60_000_000_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_milliseconds_path() {
        assert_eq!(classify(150_000.0), DurationUnit::Milliseconds);
        assert!((duration_minutes(150_000.0) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_seconds_path() {
        assert_eq!(classify(1500.0), DurationUnit::Seconds);
        assert!((duration_minutes(1500.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_already_minutes_path() {
        assert_eq!(classify(25.0), DurationUnit::Minutes);
        assert_eq!(duration_minutes(25.0), 25.0);
    }

    #[test]
    fn test_idempotent_after_conversion() {
        // A converted value must not be re-classified as a larger unit.
        for raw in [150_000_000.0, 150_000.0, 1500.0, 25.0] {
            let once = duration_minutes(raw);
            let twice = duration_minutes(once);
            assert_eq!(classify(once), DurationUnit::Minutes);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_total_on_degenerate_inputs() {
        assert_eq!(duration_minutes(0.0), 0.0);
        assert_eq!(duration_minutes(-42.0), 0.0);
        assert_eq!(duration_minutes(f64::NAN), 0.0);
        assert_eq!(duration_minutes(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_threshold_boundaries() {
        // Exactly at a threshold falls into the smaller unit.
        assert_eq!(classify(1e3), DurationUnit::Minutes);
        assert_eq!(classify(1e5), DurationUnit::Seconds);
        assert_eq!(classify(1e8), DurationUnit::Milliseconds);
    }

    #[test]
    fn test_realistic_range() {
        assert!(is_realistic(25.0));
        assert!(is_realistic(5.0));
        assert!(is_realistic(120.0));
        assert!(!is_realistic(2.5));
        assert!(!is_realistic(400.0));
    }

    #[test]
    fn test_checked_conversion_still_converts() {
        // Out-of-range values are logged but never blocked.
        assert!((duration_minutes_checked(150_000.0) - 2.5).abs() < 1e-9);
    }
}
