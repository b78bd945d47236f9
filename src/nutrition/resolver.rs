use serde::Serialize;
use tracing::debug;

use super::{NutritionRecord, NutritionTable};

/// Which lookup pass produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    /// The key occurs inside the label ("grilled chicken breast").
    KeyInLabel,
    /// The label occurs inside the key ("rice" -> "white rice").
    LabelInKey,
}

#[derive(Debug, Clone, Copy)]
pub struct FoodMatch<'a> {
    pub record: &'a NutritionRecord,
    pub kind: MatchKind,
}

/// Lowercase, trim, then drop a single trailing `s`.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase();
    let trimmed = lowered.trim();
    trimmed.strip_suffix('s').unwrap_or(trimmed).to_string()
}

impl NutritionTable {
    /// Match a free-text food label against the table.
    ///
    /// Passes run in order and the first hit wins: exact key, then the first
    /// key (in table order) contained in the label, then the first key that
    /// contains the label. Table order is the only tie-break; there is no
    /// notion of a closer or longer match, so "pineapple" lands on "apple".
    ///
    /// A label that is empty after normalization ("", "  ", "s") never
    /// matches, even though every key trivially contains the empty string;
    /// the last pass alone would otherwise return the first table entry.
    pub fn resolve(&self, label: &str) -> Option<FoodMatch<'_>> {
        let needle = normalize_label(label);
        if needle.is_empty() {
            return None;
        }

        let found = self
            .get(&needle)
            .map(|record| FoodMatch { record, kind: MatchKind::Exact })
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| needle.contains(r.key.as_str()))
                    .map(|record| FoodMatch { record, kind: MatchKind::KeyInLabel })
            })
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| r.key.contains(needle.as_str()))
                    .map(|record| FoodMatch { record, kind: MatchKind::LabelInKey })
            });

        match &found {
            Some(m) => debug!(label, key = %m.record.key, kind = ?m.kind, "food resolved"),
            None => debug!(label, "food not in reference table"),
        }
        found
    }
}
