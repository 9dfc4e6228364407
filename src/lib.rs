//! # Civ Meta
//!
//! A civilization statistics service for ranked real-time-strategy
//! matches: win rates, play rates, matchup matrices and per-map
//! performance, computed from bounded samples and served through a
//! snapshot/live/fallback degradation ladder.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (matches, participations, aggregates)
//! - **storage**: Filesystem data lake operations (JSONL)
//! - **store**: Bounded, budget-aware query seam over the data lake
//! - **resolve**: Case-tolerant identifier resolution
//! - **calculate**: Pure statistics helpers (durations, buckets, matchups)
//! - **aggregate**: Sampling aggregation engine
//! - **snapshot**: Precomputed aggregate cache and exact rebuild
//! - **resilience**: Snapshot/live/fallback degradation ladder
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod aggregate;
pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod resilience;
pub mod resolve;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use models::*;
