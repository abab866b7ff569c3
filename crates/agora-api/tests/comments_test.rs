//! Integration tests for the comment routes against PostgreSQL.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn seed_post(app: &common::TestApp) -> String {
    let (_, created) = common::post_json(
        &app.router,
        "/posts",
        "U1",
        &json!({ "title": "Thread", "content": "start" }),
    )
    .await;
    created["post_id"].as_str().unwrap().to_owned()
}

async fn reply_to(app: &common::TestApp, comment: &Value, user: &str) -> (StatusCode, Value) {
    let uri = format!(
        "/comments/{}/replies",
        comment["comment_id"].as_str().unwrap()
    );
    common::post_json(&app.router, &uri, user, &json!({ "content": "re" })).await
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_thread_is_listed_in_creation_order(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let post_id = seed_post(&app).await;
    let comments_uri = format!("/posts/{post_id}/comments");

    // Act
    let (status, root) =
        common::post_json(&app.router, &comments_uri, "U2", &json!({ "content": "a" })).await;
    let (_, reply) = reply_to(&app, &root, "U3").await;
    let (_, listed) = common::get_json(&app.router, &comments_uri).await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["level"], 1);
    assert_eq!(reply["post_id"], post_id.as_str());
    let ids: Vec<&Value> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| &c["comment_id"])
        .collect();
    assert_eq!(ids, vec![&root["comment_id"], &reply["comment_id"]]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_fourth_level_reply_is_rejected(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let post_id = seed_post(&app).await;
    let (_, mut comment) = common::post_json(
        &app.router,
        &format!("/posts/{post_id}/comments"),
        "U2",
        &json!({ "content": "root" }),
    )
    .await;
    for _ in 0..3 {
        let (status, reply) = reply_to(&app, &comment, "U2").await;
        assert_eq!(status, StatusCode::CREATED);
        comment = reply;
    }

    // Act
    let (status, body) = reply_to(&app, &comment, "U2").await;

    // Assert
    assert_eq!(comment["level"], 3);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_comment_like_and_delete(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let post_id = seed_post(&app).await;
    let (_, comment) = common::post_json(
        &app.router,
        &format!("/posts/{post_id}/comments"),
        "U2",
        &json!({ "content": "like me" }),
    )
    .await;
    let (_, reply) = reply_to(&app, &comment, "U3").await;
    let comment_uri = format!("/comments/{}", comment["comment_id"].as_str().unwrap());
    let reply_uri = format!("/comments/{}", reply["comment_id"].as_str().unwrap());

    // Act
    let (_, liked) =
        common::send(&app.router, "POST", &format!("{comment_uri}/like"), Some("U5"), None).await;
    let (denied, _) = common::send(&app.router, "DELETE", &comment_uri, Some("U3"), None).await;
    let (deleted, _) = common::send(&app.router, "DELETE", &comment_uri, Some("U2"), None).await;
    let (reply_after, _) = common::get_json(&app.router, &reply_uri).await;

    // Assert
    assert_eq!(liked["like_count"], 1);
    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(deleted, StatusCode::NO_CONTENT);
    assert_eq!(reply_after, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_replies_of_unknown_comment_is_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let uri = format!("/comments/{}/replies", uuid::Uuid::new_v4());

    let (status, body) = common::get_json(&app.router, &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "aggregate_not_found");
}
