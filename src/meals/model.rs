use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::{MacroTotals, NutritionRecord};

/// One label emitted by the image classifier. Untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    #[serde(default, alias = "portionEstimate")]
    pub portion_estimate: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MealError {
    #[error("meal has no items")]
    Empty,
    #[error("unknown food key: {0}")]
    UnknownFood(String),
    #[error("no item {0} in this meal")]
    UnknownItem(Uuid),
    #[error("servings must be at least 1, got {0}")]
    InvalidServings(u32),
    #[error("photo reference does not belong to this user")]
    ForeignPhoto,
}

/// A resolved food inside a meal. `food` is a copy taken when the item was
/// resolved, so history does not follow later table edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedFoodItem {
    pub id: Uuid,
    pub food: NutritionRecord,
    pub servings: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion_estimate: Option<String>,
}

impl LoggedFoodItem {
    pub fn macros(&self) -> MacroTotals {
        self.food.macros().scaled(self.servings)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub items: Vec<LoggedFoodItem>,
    #[serde(default)]
    pub photo_ref: Option<String>,
}

impl Meal {
    pub fn macros(&self) -> MacroTotals {
        self.items.iter().map(LoggedFoodItem::macros).sum()
    }
}

/// "Apple" for one item, "Apple & more" for several.
pub fn display_name(items: &[LoggedFoodItem]) -> Option<String> {
    match items {
        [] => None,
        [only] => Some(only.food.name.clone()),
        [first, ..] => Some(format!("{} & more", first.food.name)),
    }
}

/// A meal under construction. Items can still be re-served or dropped;
/// nothing is persisted until [`MealDraft::confirm`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealDraft {
    items: Vec<LoggedFoodItem>,
    photo_ref: Option<String>,
}

impl MealDraft {
    pub fn new(photo_ref: Option<String>) -> Self {
        Self {
            items: Vec::new(),
            photo_ref,
        }
    }

    /// Panics if `servings` is zero.
    pub fn push(
        &mut self,
        food: NutritionRecord,
        servings: u32,
        portion_estimate: Option<String>,
    ) -> Uuid {
        assert!(servings >= 1, "servings must be at least 1");
        let id = Uuid::new_v4();
        self.items.push(LoggedFoodItem {
            id,
            food,
            servings,
            portion_estimate,
        });
        id
    }

    /// Panics if `servings` is zero.
    pub fn set_servings(&mut self, item_id: Uuid, servings: u32) -> Result<(), MealError> {
        assert!(servings >= 1, "servings must be at least 1");
        self.item_mut(item_id)?.servings = servings;
        Ok(())
    }

    pub fn increment(&mut self, item_id: Uuid) -> Result<u32, MealError> {
        let item = self.item_mut(item_id)?;
        item.servings = item.servings.saturating_add(1);
        Ok(item.servings)
    }

    /// Never goes below one serving; drop the item with [`MealDraft::remove`].
    pub fn decrement(&mut self, item_id: Uuid) -> Result<u32, MealError> {
        let item = self.item_mut(item_id)?;
        item.servings = item.servings.saturating_sub(1).max(1);
        Ok(item.servings)
    }

    pub fn remove(&mut self, item_id: Uuid) -> Result<LoggedFoodItem, MealError> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(MealError::UnknownItem(item_id))?;
        Ok(self.items.remove(idx))
    }

    pub fn items(&self) -> &[LoggedFoodItem] {
        &self.items
    }

    pub fn photo_ref(&self) -> Option<&str> {
        self.photo_ref.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn display_name(&self) -> Option<String> {
        display_name(&self.items)
    }

    pub fn macros(&self) -> MacroTotals {
        self.items.iter().map(LoggedFoodItem::macros).sum()
    }

    /// Turn the draft into a loggable meal stamped with `now`.
    pub fn confirm(self, now: OffsetDateTime) -> Result<Meal, MealError> {
        let name = display_name(&self.items).ok_or(MealError::Empty)?;
        Ok(Meal {
            id: Uuid::new_v4(),
            name,
            created_at: now,
            items: self.items,
            photo_ref: self.photo_ref,
        })
    }

    fn item_mut(&mut self, item_id: Uuid) -> Result<&mut LoggedFoodItem, MealError> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(MealError::UnknownItem(item_id))
    }
}
