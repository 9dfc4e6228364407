//! Identity resolution for loosely-typed civilization and map names.
//!
//! Stored identifiers carry casing drift from several ingestion revisions.
//! The resolver tries, in order:
//!
//! 1. the lower-cased shadow index — the only case-insensitive access
//!    path that is cheap at scale,
//! 2. an exact case match,
//! 3. a single re-capitalization heuristic (first letter upper, rest
//!    lower) — a compatibility shim covering records ingested before the
//!    shadow field existed.
//!
//! All three failing is a `NotFound`, which callers must surface as a
//! 404-equivalent rather than an empty-result success.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown identifier: {0}")]
    NotFound(String),
}

/// Case-tolerant index over a set of canonical identifiers.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    /// Lower-cased shadow key -> canonical identifier.
    shadow: HashMap<String, String>,
    /// Canonical identifiers, exact case.
    canonical: HashSet<String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index where every name has a shadow key.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for name in names {
            let name = name.into();
            index.insert_with_shadow(&name);
        }
        index
    }

    /// Register a canonical name along with its lower-cased shadow key.
    pub fn insert_with_shadow(&mut self, canonical: &str) {
        self.shadow
            .entry(canonical.to_lowercase())
            .or_insert_with(|| canonical.to_string());
        self.canonical.insert(canonical.to_string());
    }

    /// Register a canonical name that has no shadow key (pre-shadow-field
    /// record); it is reachable only through steps 2 and 3.
    pub fn insert_without_shadow(&mut self, canonical: &str) {
        self.canonical.insert(canonical.to_string());
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Resolve a free-form name to its canonical identifier.
    pub fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
        let raw = raw.trim();

        if let Some(canonical) = self.shadow.get(&raw.to_lowercase()) {
            return Ok(canonical.clone());
        }

        if self.canonical.contains(raw) {
            return Ok(raw.to_string());
        }

        let recapitalized = recapitalize(raw);
        if self.canonical.contains(&recapitalized) {
            return Ok(recapitalized);
        }

        Err(ResolveError::NotFound(raw.to_string()))
    }
}

/// First letter upper-cased, rest lower-cased.
fn recapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
