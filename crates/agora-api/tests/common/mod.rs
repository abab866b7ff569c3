//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use agora_api::state::AppState;
use agora_social::application::bootstrap::SocialServices;
use agora_store::pg_store::PgSocialStore;
use agora_test_support::{InMemoryBlobStorage, RecordingPublisher, fixed_clock};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// Everything a test may want to inspect after driving the app.
pub struct TestApp {
    pub router: Router,
    pub publisher: Arc<RecordingPublisher>,
    pub blobs: Arc<InMemoryBlobStorage>,
}

/// Build the full app router over a real `PgSocialStore`, with recording
/// fakes for publishing and blob storage and a fixed clock. Uses the same
/// route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let publisher = Arc::new(RecordingPublisher::new());
    let blobs = Arc::new(InMemoryBlobStorage::new());
    let services = SocialServices {
        store: Arc::new(PgSocialStore::new(pool)),
        publisher: publisher.clone(),
        blob_storage: blobs.clone(),
        clock: Arc::new(fixed_clock()),
    };
    let state = AppState::new(services, "postgres").unwrap();

    TestApp {
        router: agora_api::app(state),
        publisher,
        blobs,
    }
}

/// Send a request as `user_id` (if any) with an optional JSON body and
/// return the status and JSON response (`Null` when the body is empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user_id: Option<&str>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("user-id", user_id);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body as `user_id`.
pub async fn post_json(
    app: &Router,
    uri: &str,
    user_id: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(user_id), Some(body)).await
}

/// Send a GET request.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None, None).await
}
