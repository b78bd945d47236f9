use tracing::debug;

use super::model::{Detection, MealDraft};
use crate::nutrition::NutritionTable;

/// Outcome of turning classifier detections into a candidate meal.
#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    /// The classifier returned nothing.
    NoDetections,
    /// Something was detected but none of it is in the reference table.
    NoneMatched { unmatched: Vec<Detection> },
    /// At least one detection resolved. `unmatched` is non-empty for a
    /// partial match.
    Matched {
        draft: MealDraft,
        unmatched: Vec<Detection>,
    },
}

impl Composition {
    pub fn is_partial(&self) -> bool {
        matches!(self, Composition::Matched { unmatched, .. } if !unmatched.is_empty())
    }
}

/// Resolve every detection, keeping the ones that match with one serving
/// each, in detection order. No confidence threshold is applied.
pub fn compose(
    table: &NutritionTable,
    detections: Vec<Detection>,
    photo_ref: Option<String>,
) -> Composition {
    if detections.is_empty() {
        return Composition::NoDetections;
    }

    let mut draft = MealDraft::new(photo_ref);
    let mut unmatched = Vec::new();
    for detection in detections {
        match table.resolve(&detection.name) {
            Some(m) => {
                draft.push(m.record.clone(), 1, detection.portion_estimate);
            }
            None => unmatched.push(detection),
        }
    }

    debug!(
        matched = draft.items().len(),
        unmatched = unmatched.len(),
        "detections composed"
    );

    if draft.is_empty() {
        Composition::NoneMatched { unmatched }
    } else {
        Composition::Matched { draft, unmatched }
    }
}
