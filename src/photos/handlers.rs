use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::storage::{ext_from_mime, user_prefix};
use crate::{
    auth::AuthUser,
    http::{internal, ApiError},
    state::AppState,
};

const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadedPhoto {
    pub photo_ref: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/photos",
            post(upload_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES)),
        )
        .route("/meals/:id/photo", get(meal_photo))
}

/// POST /photos, raw image body with an image Content-Type.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn upload_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedPhoto>), ApiError> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "empty photo".into()));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let Some(ext) = ext_from_mime(&content_type) else {
        warn!(%user_id, %content_type, "unsupported photo type");
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected a jpeg, png, webp or heic image".into(),
        ));
    };

    let key = format!("{}{}.{}", user_prefix(user_id), Uuid::new_v4(), ext);
    state
        .photos
        .put(&key, body, &content_type)
        .await
        .map_err(internal)?;

    info!(%user_id, %key, "photo stored");
    Ok((StatusCode::CREATED, Json(UploadedPhoto { photo_ref: key })))
}

/// 307 to a short-lived URL of the meal's source photo.
#[instrument(skip(state))]
pub async fn meal_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let meal = state
        .meals
        .get(user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))?;
    let key = meal
        .photo_ref
        .ok_or((StatusCode::NOT_FOUND, "Photo not found".to_string()))?;

    let url = state
        .photos
        .presign_get(&key, state.config.storage.url_ttl_secs)
        .await
        .map_err(internal)?;
    Ok(Redirect::temporary(&url))
}
