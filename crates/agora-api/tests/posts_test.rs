//! Integration tests for the post routes against PostgreSQL.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_then_get_post(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let body = json!({ "title": "Hello", "content": "World" });

    // Act
    let (status, created) = common::post_json(&app.router, "/posts", "U1", &body).await;
    let uri = format!("/posts/{}", created["post_id"].as_str().unwrap());
    let (get_status, fetched) = common::get_json(&app.router, &uri).await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(get_status, StatusCode::OK);
    assert_eq!(fetched["title"], "Hello");
    assert_eq!(fetched["author_id"], "U1");
    assert_eq!(fetched["version"], 1);
    assert_eq!(app.publisher.channels(), vec!["social.post_created"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_images_are_uploaded_and_attached(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let body = json!({
        "title": "Pics",
        "content": "look",
        "images": [
            { "filename": "a.png", "content_type": "image/png", "data": "aGVsbG8=" },
            { "filename": "b.jpg", "content_type": "image/jpeg", "data": "d29ybGQ=" }
        ]
    });

    // Act
    let (status, created) = common::post_json(&app.router, "/posts", "U1", &body).await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    let post_id = created["post_id"].as_str().unwrap();
    assert_eq!(created["images"].as_array().unwrap().len(), 2);
    let stored = app.blobs.get(&format!("posts/{post_id}/a.png")).unwrap();
    assert_eq!(stored.data, b"hello".to_vec());
    assert_eq!(stored.content_type, "image/png");
    assert_eq!(
        app.publisher.channels(),
        vec![
            "social.post_created",
            "social.post_image_attached",
            "social.post_image_attached"
        ]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_edit_is_limited_to_the_author(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let (_, created) = common::post_json(
        &app.router,
        "/posts",
        "U1",
        &json!({ "title": "Draft", "content": "v1" }),
    )
    .await;
    let uri = format!("/posts/{}", created["post_id"].as_str().unwrap());
    let edit = json!({ "title": "Final", "content": "v2" });

    // Act
    let (denied, _) = common::send(&app.router, "PUT", &uri, Some("U2"), Some(&edit)).await;
    let (allowed, edited) = common::send(&app.router, "PUT", &uri, Some("U1"), Some(&edit)).await;

    // Assert
    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(allowed, StatusCode::OK);
    assert_eq!(edited["title"], "Final");
    assert_eq!(edited["version"], 2);
    assert!(
        app.publisher
            .channels()
            .contains(&"social.post_action_denied".to_owned())
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_like_toggle_persists(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let (_, created) = common::post_json(
        &app.router,
        "/posts",
        "U1",
        &json!({ "title": "T", "content": "C" }),
    )
    .await;
    let post_uri = format!("/posts/{}", created["post_id"].as_str().unwrap());
    let like_uri = format!("{post_uri}/like");

    // Act
    common::send(&app.router, "POST", &like_uri, Some("U2"), None).await;
    common::send(&app.router, "POST", &like_uri, Some("U3"), None).await;
    common::send(&app.router, "POST", &like_uri, Some("U2"), None).await;
    let (_, fetched) = common::get_json(&app.router, &post_uri).await;

    // Assert
    assert_eq!(fetched["like_count"], 1);
    assert_eq!(fetched["version"], 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_posts_by_title(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    for title in ["news", "notes", "news"] {
        common::post_json(
            &app.router,
            "/posts",
            "U1",
            &json!({ "title": title, "content": "..." }),
        )
        .await;
    }

    // Act
    let (status, exact) = common::get_json(&app.router, "/posts?title=news").await;
    let (_, paged) = common::get_json(&app.router, "/posts?order=title&limit=1&offset=2").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exact.as_array().unwrap().len(), 2);
    assert_eq!(paged.as_array().unwrap().len(), 1);
    assert_eq!(paged[0]["title"], "notes");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_post_removes_comments(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let (_, created) = common::post_json(
        &app.router,
        "/posts",
        "U1",
        &json!({ "title": "T", "content": "C" }),
    )
    .await;
    let post_uri = format!("/posts/{}", created["post_id"].as_str().unwrap());
    let (_, comment) = common::post_json(
        &app.router,
        &format!("{post_uri}/comments"),
        "U2",
        &json!({ "content": "hi" }),
    )
    .await;

    // Act
    let (status, _) = common::send(&app.router, "DELETE", &post_uri, Some("U1"), None).await;

    // Assert
    assert_eq!(status, StatusCode::NO_CONTENT);
    let comment_uri = format!("/comments/{}", comment["comment_id"].as_str().unwrap());
    let (after, _) = common::get_json(&app.router, &comment_uri).await;
    assert_eq!(after, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_invalid_post_id_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/posts/not-a-uuid")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
