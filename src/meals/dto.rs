use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::compose::Composition;
use super::model::{Detection, LoggedFoodItem, Meal};
use crate::nutrition::MacroTotals;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub detections: Vec<Detection>,
    pub photo_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    NoDetections,
    NoneMatched,
    Matched,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: LoggedFoodItem,
    pub totals: MacroTotals,
}

impl From<&LoggedFoodItem> for ItemView {
    fn from(item: &LoggedFoodItem) -> Self {
        Self {
            totals: item.macros(),
            item: item.clone(),
        }
    }
}

/// Candidate meal shown to the user before they confirm it.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub outcome: ResolveOutcome,
    pub partial: bool,
    pub name: Option<String>,
    pub items: Vec<ItemView>,
    pub unmatched: Vec<String>,
    pub photo_ref: Option<String>,
    pub totals: MacroTotals,
}

impl From<Composition> for ResolveResponse {
    fn from(c: Composition) -> Self {
        let partial = c.is_partial();
        match c {
            Composition::NoDetections => Self {
                outcome: ResolveOutcome::NoDetections,
                partial,
                name: None,
                items: Vec::new(),
                unmatched: Vec::new(),
                photo_ref: None,
                totals: MacroTotals::ZERO,
            },
            Composition::NoneMatched { unmatched } => Self {
                outcome: ResolveOutcome::NoneMatched,
                partial,
                name: None,
                items: Vec::new(),
                unmatched: unmatched.into_iter().map(|d| d.name).collect(),
                photo_ref: None,
                totals: MacroTotals::ZERO,
            },
            Composition::Matched { draft, unmatched } => Self {
                outcome: ResolveOutcome::Matched,
                partial,
                name: draft.display_name(),
                items: draft.items().iter().map(ItemView::from).collect(),
                unmatched: unmatched.into_iter().map(|d| d.name).collect(),
                photo_ref: draft.photo_ref().map(str::to_string),
                totals: draft.macros(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub food_key: String,
    #[serde(default = "one")]
    pub servings: u32,
    pub portion_estimate: Option<String>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub items: Vec<NewItem>,
    pub photo_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub items: Vec<ItemView>,
    pub photo_ref: Option<String>,
    pub totals: MacroTotals,
}

impl From<&Meal> for MealResponse {
    fn from(m: &Meal) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            created_at: m.created_at,
            items: m.items.iter().map(ItemView::from).collect(),
            photo_ref: m.photo_ref.clone(),
            totals: m.macros(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealListItem {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub item_count: usize,
    pub has_photo: bool,
    pub totals: MacroTotals,
}

impl From<&Meal> for MealListItem {
    fn from(m: &Meal) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            created_at: m.created_at,
            item_count: m.items.len(),
            has_photo: m.photo_ref.is_some(),
            totals: m.macros(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
