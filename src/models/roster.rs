//! The playable civilization roster.
//!
//! Canonical display names. The resolver seeds its index from this table
//! so lookups work before any records have been scanned, and the static
//! fallback rung serves placeholder rows for exactly these names.

pub const CIV_ROSTER: &[&str] = &[
    "Armenians",
    "Aztecs",
    "Bengalis",
    "Berbers",
    "Bohemians",
    "Britons",
    "Bulgarians",
    "Burgundians",
    "Burmese",
    "Byzantines",
    "Celts",
    "Chinese",
    "Cumans",
    "Dravidians",
    "Ethiopians",
    "Franks",
    "Georgians",
    "Goths",
    "Gurjaras",
    "Hindustanis",
    "Huns",
    "Incas",
    "Italians",
    "Japanese",
    "Khmer",
    "Koreans",
    "Lithuanians",
    "Magyars",
    "Malay",
    "Malians",
    "Mayans",
    "Mongols",
    "Persians",
    "Poles",
    "Portuguese",
    "Romans",
    "Saracens",
    "Sicilians",
    "Slavs",
    "Spanish",
    "Tatars",
    "Teutons",
    "Turks",
    "Vietnamese",
    "Vikings",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_size() {
        assert_eq!(CIV_ROSTER.len(), 45);
    }

    #[test]
    fn test_roster_sorted_and_unique() {
        let mut sorted = CIV_ROSTER.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, CIV_ROSTER);
    }
}
