//! Core data models for the civilization meta tracker.

mod aggregates;
mod match_record;
mod participation;
mod roster;

pub use aggregates::*;
pub use match_record::*;
pub use participation::*;
pub use roster::*;
