use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::Meal;

/// Per-user, append-only meal log.
#[async_trait]
pub trait MealStore: Send + Sync {
    /// Store a confirmed meal. Either the whole meal lands or nothing does.
    async fn append(&self, user_id: Uuid, meal: &Meal) -> anyhow::Result<()>;

    /// Every meal of the user, newest first.
    async fn list_all(&self, user_id: Uuid) -> anyhow::Result<Vec<Meal>>;

    async fn list_page(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Meal>>;

    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>>;
}

#[derive(Default)]
pub struct InMemoryMealStore {
    meals: RwLock<HashMap<Uuid, Vec<Meal>>>,
}

impl InMemoryMealStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MealStore for InMemoryMealStore {
    async fn append(&self, user_id: Uuid, meal: &Meal) -> anyhow::Result<()> {
        anyhow::ensure!(!meal.items.is_empty(), "refusing to store a meal without items");
        self.meals
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(meal.clone());
        Ok(())
    }

    async fn list_all(&self, user_id: Uuid) -> anyhow::Result<Vec<Meal>> {
        let mut meals = self
            .meals
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default();
        // stable sort keeps later appends first among equal timestamps
        meals.reverse();
        meals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(meals)
    }

    async fn list_page(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Meal>> {
        let limit = usize::try_from(limit.max(0))?;
        let offset = usize::try_from(offset.max(0))?;
        Ok(self
            .list_all(user_id)
            .await?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
        Ok(self
            .meals
            .read()
            .await
            .get(&user_id)
            .and_then(|meals| meals.iter().find(|m| m.id == meal_id).cloned()))
    }
}
