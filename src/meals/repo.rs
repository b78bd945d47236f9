use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{LoggedFoodItem, Meal};
use super::store::MealStore;
use crate::nutrition::NutritionRecord;

#[derive(Debug, FromRow)]
struct MealRow {
    id: Uuid,
    name: String,
    photo_ref: Option<String>,
    created_at: OffsetDateTime,
}

/// Item row; the nutrition columns are the record copy made at resolution.
#[derive(Debug, FromRow)]
struct MealItemRow {
    meal_id: Uuid,
    id: Uuid,
    food_key: String,
    food_name: String,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
    serving_unit: String,
    servings: i64,
    portion_estimate: Option<String>,
}

impl TryFrom<MealItemRow> for LoggedFoodItem {
    type Error = anyhow::Error;

    fn try_from(r: MealItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            food: NutritionRecord {
                key: r.food_key,
                name: r.food_name,
                calories: r.calories,
                protein_g: r.protein_g,
                carbs_g: r.carbs_g,
                fat_g: r.fat_g,
                serving_unit: r.serving_unit,
            },
            servings: u32::try_from(r.servings)
                .with_context(|| format!("servings out of range on item {}", r.id))?,
            portion_estimate: r.portion_estimate,
        })
    }
}

pub struct PgMealStore {
    db: PgPool,
}

impl PgMealStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn attach_items(&self, rows: Vec<MealRow>) -> anyhow::Result<Vec<Meal>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, MealItemRow>(
            r#"
            SELECT meal_id, id, food_key, food_name, calories, protein_g, carbs_g, fat_g,
                   serving_unit, servings, portion_estimate
              FROM meal_items
             WHERE meal_id = ANY($1)
             ORDER BY meal_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await
        .context("load meal items")?;

        let mut by_meal: HashMap<Uuid, Vec<LoggedFoodItem>> = HashMap::new();
        for row in items {
            let meal_id = row.meal_id;
            by_meal.entry(meal_id).or_default().push(row.try_into()?);
        }

        Ok(rows
            .into_iter()
            .map(|r| Meal {
                items: by_meal.remove(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                created_at: r.created_at,
                photo_ref: r.photo_ref,
            })
            .collect())
    }
}

#[async_trait]
impl MealStore for PgMealStore {
    async fn append(&self, user_id: Uuid, meal: &Meal) -> anyhow::Result<()> {
        anyhow::ensure!(!meal.items.is_empty(), "refusing to store a meal without items");

        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(
            r#"
            INSERT INTO meals (id, user_id, name, photo_ref, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(meal.id)
        .bind(user_id)
        .bind(&meal.name)
        .bind(meal.photo_ref.as_deref())
        .bind(meal.created_at)
        .execute(&mut *tx)
        .await
        .context("insert meal")?;

        for (position, item) in meal.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO meal_items (meal_id, id, position, food_key, food_name, calories,
                                        protein_g, carbs_g, fat_g, serving_unit, servings,
                                        portion_estimate)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(meal.id)
            .bind(item.id)
            .bind(position as i32)
            .bind(&item.food.key)
            .bind(&item.food.name)
            .bind(item.food.calories)
            .bind(item.food.protein_g)
            .bind(item.food.carbs_g)
            .bind(item.food.fat_g)
            .bind(&item.food.serving_unit)
            .bind(i64::from(item.servings))
            .bind(item.portion_estimate.as_deref())
            .execute(&mut *tx)
            .await
            .context("insert meal item")?;
        }

        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn list_all(&self, user_id: Uuid) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, name, photo_ref, created_at
              FROM meals
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list meals")?;
        self.attach_items(rows).await
    }

    async fn list_page(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, name, photo_ref, created_at
              FROM meals
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list meals page")?;
        self.attach_items(rows).await
    }

    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, name, photo_ref, created_at
              FROM meals
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get meal")?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}
