use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::{macros::format_description, Date, UtcOffset};
use tracing::{debug, instrument};

use super::dto::{DayQuery, DaySummaryResponse, WindowQuery, WindowSummaryResponse};
use super::{local_date, summarize_day, summarize_window, Window};
use crate::{
    auth::AuthUser,
    http::{bad_request, internal, ApiError},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary/day", get(day_summary))
        .route("/summary/window", get(window_summary))
}

/// GET /summary/day?date=YYYY-MM-DD&tz_offset_minutes=N
#[instrument(skip(state))]
pub async fn day_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DayQuery>,
) -> Result<Json<DaySummaryResponse>, ApiError> {
    let minutes = q
        .tz_offset_minutes
        .unwrap_or(state.config.default_tz_offset_minutes);
    let zone = zone_from_minutes(minutes)?;
    let day = match q.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => local_date(state.clock.now_utc(), zone),
    };

    let meals = state.meals.list_all(user_id).await.map_err(internal)?;
    let totals = summarize_day(&meals, day, zone);
    debug!(%user_id, %day, meals = meals.len(), "day summarized");

    Ok(Json(DaySummaryResponse {
        date: day.to_string(),
        tz_offset_minutes: minutes,
        totals,
    }))
}

/// GET /summary/window?days=7|30|90&tz_offset_minutes=N
#[instrument(skip(state))]
pub async fn window_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<WindowQuery>,
) -> Result<Json<WindowSummaryResponse>, ApiError> {
    let window = Window::try_from(q.days).map_err(bad_request)?;
    let minutes = q
        .tz_offset_minutes
        .unwrap_or(state.config.default_tz_offset_minutes);
    let zone = zone_from_minutes(minutes)?;
    let today = local_date(state.clock.now_utc(), zone);

    let meals = state.meals.list_all(user_id).await.map_err(internal)?;
    let summary = summarize_window(&meals, window, today, zone);
    debug!(%user_id, %today, days = window.days(), "window summarized");

    Ok(Json(WindowSummaryResponse::new(window.days(), minutes, &summary)))
}

fn zone_from_minutes(minutes: i32) -> Result<UtcOffset, ApiError> {
    minutes
        .checked_mul(60)
        .and_then(|secs| UtcOffset::from_whole_seconds(secs).ok())
        .ok_or_else(|| bad_request(format!("invalid tz_offset_minutes: {minutes}")))
}

fn parse_date(raw: &str) -> Result<Date, ApiError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format).map_err(|_| bad_request(format!("invalid date: {raw}")))
}
