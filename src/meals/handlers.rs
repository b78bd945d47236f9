use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::compose::compose;
use super::dto::{
    CreateMealRequest, MealListItem, MealResponse, Pagination, ResolveRequest, ResolveResponse,
};
use super::model::{MealDraft, MealError};
use crate::{
    auth::AuthUser,
    http::{bad_request, internal, ApiError},
    nutrition::NutritionRecord,
    photos::storage::user_prefix,
    state::AppState,
};

const MAX_PAGE: i64 = 100;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/resolve", post(resolve_detections))
        .route("/meals", post(create_meal))
}

/// GET /foods, the reference table in definition order.
pub async fn list_foods(State(state): State<AppState>) -> Json<Vec<NutritionRecord>> {
    Json(state.foods.records().cloned().collect())
}

/// POST /meals/resolve { detections: [...], photo_ref? }
///
/// Matches classifier output against the reference table and returns the
/// candidate meal. Nothing is stored.
#[instrument(skip(state, body), fields(detections = body.detections.len()))]
pub async fn resolve_detections(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    if let Some(photo_ref) = &body.photo_ref {
        check_photo_owner(user_id, photo_ref)?;
    }
    let composition = compose(state.foods, body.detections, body.photo_ref);
    let response = ResolveResponse::from(composition);
    info!(
        %user_id,
        outcome = ?response.outcome,
        matched = response.items.len(),
        unmatched = response.unmatched.len(),
        "detections resolved"
    );
    Ok(Json(response))
}

/// POST /meals { items: [{ food_key, servings, portion_estimate? }], photo_ref? }
#[instrument(skip(state, body), fields(items = body.items.len()))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMealRequest>,
) -> Result<(StatusCode, HeaderMap, Json<MealResponse>), ApiError> {
    if let Some(photo_ref) = &body.photo_ref {
        check_photo_owner(user_id, photo_ref)?;
    }

    let mut draft = MealDraft::new(body.photo_ref);
    for item in body.items {
        if item.servings == 0 {
            return Err(bad_request(MealError::InvalidServings(item.servings)));
        }
        let food = state
            .foods
            .get(&item.food_key)
            .ok_or_else(|| bad_request(MealError::UnknownFood(item.food_key.clone())))?;
        draft.push(food.clone(), item.servings, item.portion_estimate);
    }

    let meal = draft
        .confirm(state.clock.now_utc())
        .map_err(bad_request)?;
    state.meals.append(user_id, &meal).await.map_err(|e| {
        error!(error = %e, %user_id, meal_id = %meal.id, "append meal failed");
        internal(e)
    })?;
    info!(%user_id, meal_id = %meal.id, items = meal.items.len(), "meal logged");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&format!("/api/v1/meals/{}", meal.id)).map_err(internal)?,
    );
    Ok((StatusCode::CREATED, headers, Json(MealResponse::from(&meal))))
}

/// GET /meals?limit&offset, newest first.
#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MealListItem>>, ApiError> {
    let limit = p.limit.clamp(1, MAX_PAGE);
    let offset = p.offset.max(0);
    let meals = state
        .meals
        .list_page(user_id, limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(meals.iter().map(MealListItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealResponse>, ApiError> {
    match state.meals.get(user_id, id).await.map_err(internal)? {
        Some(meal) => Ok(Json(MealResponse::from(&meal))),
        None => {
            warn!(%user_id, %id, "meal not found");
            Err((StatusCode::NOT_FOUND, "Meal not found".into()))
        }
    }
}

fn check_photo_owner(user_id: Uuid, photo_ref: &str) -> Result<(), ApiError> {
    if photo_ref.starts_with(&user_prefix(user_id)) && !photo_ref.contains("..") {
        Ok(())
    } else {
        warn!(%user_id, photo_ref, "photo reference outside caller's prefix");
        Err(bad_request(MealError::ForeignPhoto))
    }
}
