use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{meals, photos, summary};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(meals::router())
                .merge(summary::handlers::router())
                .merge(photos::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, HeaderMap, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use time::macros::datetime;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::JwtKeys;
    use crate::meals::MealDraft;

    struct Harness {
        app: Router,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::fake(datetime!(2026-10-19 12:00 UTC));
            Self {
                app: build_app(state.clone()),
                state,
            }
        }

        fn token(&self, user: Uuid) -> String {
            JwtKeys::from_ref(&self.state).sign_access(user).unwrap()
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let headers = res.headers().clone();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, headers, body)
        }

        async fn get(&self, user: Uuid, uri: &str) -> (StatusCode, HeaderMap, Value) {
            let req = Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .body(Body::empty())
                .unwrap();
            self.send(req).await
        }

        async fn post_json(
            &self,
            user: Uuid,
            uri: &str,
            body: Value,
        ) -> (StatusCode, HeaderMap, Value) {
            let req = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }

        async fn post_photo(
            &self,
            user: Uuid,
            content_type: &str,
            bytes: &'static [u8],
        ) -> (StatusCode, HeaderMap, Value) {
            let req = Request::builder()
                .method(Method::POST)
                .uri("/api/v1/photos")
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(bytes))
                .unwrap();
            self.send(req).await
        }
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let h = Harness::new();
        let req = Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn meals_require_a_valid_bearer_token() {
        let h = Harness::new();
        let req = Request::builder().uri("/api/v1/meals").body(Body::empty()).unwrap();
        let (status, _, _) = h.send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/api/v1/meals")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = h.send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn foods_lists_the_reference_table_in_order() {
        let h = Harness::new();
        let req = Request::builder().uri("/api/v1/foods").body(Body::empty()).unwrap();
        let (status, _, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK);
        let foods = body.as_array().unwrap();
        assert_eq!(foods.len(), 12);
        assert_eq!(foods[0]["key"], "apple");
    }

    #[tokio::test]
    async fn resolve_reports_partial_matches() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let (status, _, body) = h
            .post_json(
                user,
                "/api/v1/meals/resolve",
                json!({ "detections": [
                    { "name": "Apple", "portionEstimate": "1 medium", "confidence": 0.9 },
                    { "name": "Unicorn Steak", "portion_estimate": "1 slab", "confidence": 0.5 }
                ]}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "matched");
        assert_eq!(body["partial"], true);
        assert_eq!(body["name"], "Apple");
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["food"]["key"], "apple");
        assert_eq!(body["items"][0]["servings"], 1);
        assert_eq!(body["items"][0]["portion_estimate"], "1 medium");
        assert_eq!(body["unmatched"], json!(["Unicorn Steak"]));
        assert_eq!(body["totals"]["calories"], 95.0);

        // nothing stored
        assert!(h.state.meals.list_all(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_distinguishes_empty_outcomes() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let (_, _, body) = h
            .post_json(user, "/api/v1/meals/resolve", json!({ "detections": [] }))
            .await;
        assert_eq!(body["outcome"], "no_detections");
        assert_eq!(body["partial"], false);

        let (_, _, body) = h
            .post_json(
                user,
                "/api/v1/meals/resolve",
                json!({ "detections": [{ "name": "xyz-nonfood", "confidence": 0.4 }] }),
            )
            .await;
        assert_eq!(body["outcome"], "none_matched");
        assert_eq!(body["partial"], false);
        assert_eq!(body["unmatched"], json!(["xyz-nonfood"]));
    }

    #[tokio::test]
    async fn logged_meal_shows_up_in_summaries() {
        let h = Harness::new();
        let user = Uuid::new_v4();

        let (status, headers, meal) = h
            .post_json(
                user,
                "/api/v1/meals",
                json!({ "items": [{ "food_key": "apple", "servings": 2 }] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(meal["name"], "Apple");
        assert_eq!(meal["created_at"], "2026-10-19T12:00:00Z");
        let location = headers[header::LOCATION].to_str().unwrap();
        assert_eq!(location, format!("/api/v1/meals/{}", meal["id"].as_str().unwrap()));

        let mut yesterday = MealDraft::new(None);
        yesterday.push(h.state.foods.get("banana").unwrap().clone(), 1, None);
        let yesterday = yesterday.confirm(datetime!(2026-10-18 09:00 UTC)).unwrap();
        h.state.meals.append(user, &yesterday).await.unwrap();

        let (status, _, day) = h.get(user, "/api/v1/summary/day").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(day["date"], "2026-10-19");
        assert_eq!(day["totals"]["calories"], 190.0);
        assert_eq!(day["totals"]["protein_g"], 1.0);
        assert_eq!(day["totals"]["carbs_g"], 50.0);
        assert_eq!(day["totals"]["fat_g"], 0.6);

        let (_, _, day) = h.get(user, "/api/v1/summary/day?date=2026-10-18").await;
        assert_eq!(day["totals"]["calories"], 105.0);

        let (status, _, window) = h.get(user, "/api/v1/summary/window?days=7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(window["days"], 7);
        assert_eq!(window["total"]["calories"], 295.0);
        let series = window["series"].as_array().unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series[0]["date"], "2026-10-13");
        assert_eq!(series[6]["date"], "2026-10-19");
        assert_eq!(series[0]["totals"]["calories"], 0.0);

        let (_, _, list) = h.get(user, "/api/v1/meals").await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "Apple");
        assert_eq!(list[1]["name"], "Banana");
    }

    #[tokio::test]
    async fn summaries_follow_the_requested_zone() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let mut late = MealDraft::new(None);
        late.push(h.state.foods.get("salmon").unwrap().clone(), 1, None);
        h.state
            .meals
            .append(user, &late.confirm(datetime!(2026-10-19 03:00 UTC)).unwrap())
            .await
            .unwrap();

        // clock is 12:00 UTC; at UTC-5 it is 07:00 on the 19th
        // and the meal was at 22:00 on the 18th
        let (_, _, day) = h.get(user, "/api/v1/summary/day?tz_offset_minutes=-300").await;
        assert_eq!(day["date"], "2026-10-19");
        assert_eq!(day["totals"]["calories"], 0.0);

        let (_, _, day) = h
            .get(user, "/api/v1/summary/day?date=2026-10-18&tz_offset_minutes=-300")
            .await;
        assert_eq!(day["totals"]["calories"], 208.0);
    }

    #[tokio::test]
    async fn summary_rejects_bad_parameters() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let (status, _, _) = h.get(user, "/api/v1/summary/window?days=14").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _, _) = h.get(user, "/api/v1/summary/window?days=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _, _) = h.get(user, "/api/v1/summary/day?tz_offset_minutes=100000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _, _) = h.get(user, "/api/v1/summary/day?date=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_meal_rejects_bad_input() {
        let h = Harness::new();
        let user = Uuid::new_v4();

        let (status, _, _) = h.post_json(user, "/api/v1/meals", json!({ "items": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let zero = json!({ "items": [{ "food_key": "apple", "servings": 0 }] });
        let (status, _, _) = h.post_json(user, "/api/v1/meals", zero).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = h
            .post_json(user, "/api/v1/meals", json!({ "items": [{ "food_key": "unicorn steak" }] }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let other = Uuid::new_v4();
        let (status, _, _) = h
            .post_json(
                user,
                "/api/v1/meals",
                json!({
                    "items": [{ "food_key": "apple" }],
                    "photo_ref": format!("photos/{other}/x.jpg")
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(h.state.meals.list_all(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_meal_accepts_servings_beyond_i32() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let big = json!({ "items": [{ "food_key": "apple", "servings": 3_000_000_000u32 }] });

        let (status, _, meal) = h.post_json(user, "/api/v1/meals", big).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(meal["items"][0]["servings"], 3_000_000_000u32);
        assert_eq!(meal["totals"]["calories"], 95.0 * 3_000_000_000.0);

        let stored = h.state.meals.list_all(user).await.unwrap();
        assert_eq!(stored[0].items[0].servings, 3_000_000_000);
    }

    #[tokio::test]
    async fn meals_are_private_to_their_owner() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        let (_, _, meal) = h
            .post_json(owner, "/api/v1/meals", json!({ "items": [{ "food_key": "egg" }] }))
            .await;
        let uri = format!("/api/v1/meals/{}", meal["id"].as_str().unwrap());

        let (status, _, body) = h.get(owner, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["totals"]["calories"], 78.0);

        let (status, _, _) = h.get(Uuid::new_v4(), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn photo_upload_and_redirect() {
        let h = Harness::new();
        let user = Uuid::new_v4();

        let (status, _, _) = h.post_photo(user, "text/plain", b"hello").await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let (status, _, _) = h.post_photo(user, "image/png", b"").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, photo) = h.post_photo(user, "image/png", b"\x89PNG fake").await;
        assert_eq!(status, StatusCode::CREATED);
        let photo_ref = photo["photo_ref"].as_str().unwrap().to_string();
        assert!(photo_ref.starts_with(&format!("photos/{user}/")));
        assert!(photo_ref.ends_with(".png"));

        let (status, _, meal) = h
            .post_json(
                user,
                "/api/v1/meals",
                json!({ "items": [{ "food_key": "avocado" }], "photo_ref": photo_ref }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = meal["id"].as_str().unwrap();

        let (status, headers, _) = h.get(user, &format!("/api/v1/meals/{id}/photo")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        let location = headers[header::LOCATION].to_str().unwrap();
        assert_eq!(location, format!("https://photos.test/{photo_ref}?ttl=600"));
    }

    #[tokio::test]
    async fn meal_without_photo_has_no_redirect() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let (_, _, meal) = h
            .post_json(user, "/api/v1/meals", json!({ "items": [{ "food_key": "orange" }] }))
            .await;
        let (status, _, _) = h
            .get(user, &format!("/api/v1/meals/{}/photo", meal["id"].as_str().unwrap()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
