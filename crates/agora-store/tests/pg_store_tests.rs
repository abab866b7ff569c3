//! Integration tests for `PgSocialStore`.

use agora_core::clock::Clock;
use agora_core::error::DomainError;
use agora_social::domain::entities::{Image, Like, LikeTarget};
use agora_social::domain::records::{
    CommentFilter, CommentRecord, PostFilter, PostOrder, PostRecord,
};
use agora_social::domain::store::SocialStore;
use agora_store::pg_store::PgSocialStore;
use agora_test_support::fixed_clock;
use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `PostRecord` with sensible defaults.
fn make_post(title: &str, minutes: i64) -> PostRecord {
    let created_at = fixed_clock().now() + Duration::minutes(minutes);
    PostRecord {
        id: Uuid::new_v4(),
        title: title.to_owned(),
        content: format!("about {title}"),
        author_id: "U1".to_owned(),
        likes: vec![],
        images: vec![],
        version: 1,
        created_at,
        updated_at: created_at,
    }
}

fn make_comment(post_id: Uuid, parent_id: Option<Uuid>, level: u8) -> CommentRecord {
    CommentRecord {
        id: Uuid::new_v4(),
        post_id,
        parent_id,
        author_id: "U2".to_owned(),
        content: "hi".to_owned(),
        level,
        likes: vec![],
        version: 1,
        created_at: fixed_clock().now(),
    }
}

async fn insert_posts(store: &PgSocialStore, posts: &[&PostRecord]) {
    let mut tx = store.begin().await.unwrap();
    for post in posts {
        tx.posts().insert(post).await.unwrap();
    }
    tx.commit().await.unwrap();
}

// --- posts ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_returns_none_for_unknown_post(pool: PgPool) {
    let store = PgSocialStore::new(pool);
    let mut tx = store.begin().await.unwrap();

    let found = tx.posts().find(Uuid::new_v4()).await.unwrap();

    assert!(found.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_and_find_round_trips_likes_and_images(pool: PgPool) {
    // Arrange
    let store = PgSocialStore::new(pool);
    let mut post = make_post("T", 0);
    post.likes.push(Like::new("A", LikeTarget::Post(post.id), post.created_at));
    post.images.push(Image {
        id: Uuid::new_v4(),
        path: format!("posts/{}/a.png", post.id),
    });

    // Act
    insert_posts(&store, &[&post]).await;
    let mut tx = store.begin().await.unwrap();
    let loaded = tx.posts().find(post.id).await.unwrap().unwrap();

    // Assert
    assert_eq!(loaded, post);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_replaces_likes_and_bumps_version(pool: PgPool) {
    // Arrange
    let store = PgSocialStore::new(pool);
    let mut post = make_post("T", 0);
    post.likes.push(Like::new("A", LikeTarget::Post(post.id), post.created_at));
    insert_posts(&store, &[&post]).await;

    // Act
    post.title = "T2".to_owned();
    post.version = 2;
    post.likes.clear();
    post.likes.push(Like::new("B", LikeTarget::Post(post.id), post.created_at));
    let mut tx = store.begin().await.unwrap();
    tx.posts().update(&post).await.unwrap();
    tx.commit().await.unwrap();

    // Assert
    let mut tx = store.begin().await.unwrap();
    let loaded = tx.posts().find(post.id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "T2");
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.likes.len(), 1);
    assert_eq!(loaded.likes[0].user_id, "B");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_dropped_transaction_is_rolled_back(pool: PgPool) {
    let store = PgSocialStore::new(pool);
    let post = make_post("T", 0);

    {
        let mut tx = store.begin().await.unwrap();
        tx.posts().insert(&post).await.unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    assert!(tx.posts().find(post.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_query_filters_orders_and_pages(pool: PgPool) {
    // Arrange
    let store = PgSocialStore::new(pool);
    let (a, b, c) = (make_post("alpha", 0), make_post("beta", 1), make_post("gamma", 2));
    insert_posts(&store, &[&a, &b, &c]).await;
    let mut tx = store.begin().await.unwrap();

    // Act
    let newest_first = tx.posts().query(&PostFilter::default()).await.unwrap();
    let paged = tx
        .posts()
        .query(&PostFilter {
            order: PostOrder::TitleAsc,
            limit: Some(1),
            offset: 1,
            ..PostFilter::default()
        })
        .await
        .unwrap();
    let containing = tx
        .posts()
        .query(&PostFilter {
            title_contains: Some("mm".to_owned()),
            ..PostFilter::default()
        })
        .await
        .unwrap();
    let exact = tx.posts().query(&PostFilter::by_title("beta")).await.unwrap();

    // Assert
    let titles: Vec<&str> = newest_first.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["gamma", "beta", "alpha"]);
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].title, "beta");
    assert_eq!(containing.len(), 1);
    assert_eq!(containing[0].id, c.id);
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].id, b.id);
}

// --- comments ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_comment_on_missing_post_is_a_storage_error(pool: PgPool) {
    let store = PgSocialStore::new(pool);
    let mut tx = store.begin().await.unwrap();

    let result = tx
        .comments()
        .insert(&make_comment(Uuid::new_v4(), None, 0))
        .await;

    assert!(matches!(result, Err(DomainError::Storage(_))));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_comments_query_in_creation_order_and_delete_cascades(pool: PgPool) {
    // Arrange
    let store = PgSocialStore::new(pool);
    let post = make_post("T", 0);
    let root = make_comment(post.id, None, 0);
    let mut reply = make_comment(post.id, Some(root.id), 1);
    reply
        .likes
        .push(Like::new("A", LikeTarget::Comment(reply.id), reply.created_at));
    let sibling = make_comment(post.id, None, 0);
    let mut tx = store.begin().await.unwrap();
    tx.posts().insert(&post).await.unwrap();
    for comment in [&root, &reply, &sibling] {
        tx.comments().insert(comment).await.unwrap();
    }
    tx.commit().await.unwrap();

    // Act
    let mut tx = store.begin().await.unwrap();
    let all = tx
        .comments()
        .query(&CommentFilter::for_post(post.id))
        .await
        .unwrap();
    let replies = tx
        .comments()
        .query(&CommentFilter::replies_to(root.id))
        .await
        .unwrap();
    tx.comments().delete(root.id).await.unwrap();
    tx.commit().await.unwrap();

    // Assert
    let ids: Vec<Uuid> = all.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![root.id, reply.id, sibling.id]);
    assert_eq!(replies, vec![reply.clone()]);
    let mut tx = store.begin().await.unwrap();
    let remaining = tx
        .comments()
        .query(&CommentFilter::for_post(post.id))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, sibling.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_deleting_a_post_removes_its_comments(pool: PgPool) {
    let store = PgSocialStore::new(pool);
    let post = make_post("T", 0);
    let comment = make_comment(post.id, None, 0);
    let mut tx = store.begin().await.unwrap();
    tx.posts().insert(&post).await.unwrap();
    tx.comments().insert(&comment).await.unwrap();
    tx.posts().delete(post.id).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(tx.comments().find(comment.id).await.unwrap().is_none());
}
