//! Query handlers for the social context.
//!
//! Queries read through a unit-of-work scope that is never committed and
//! return read-only view DTOs.

use agora_core::aggregate::AggregateRoot;
use agora_core::blob_storage::BlobStorage;
use agora_core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::unit_of_work::SocialUnitOfWork;
use crate::domain::aggregates::{Comment, Post};
use crate::domain::records::{CommentFilter, PostFilter};

/// Read-only view of an attached image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    /// The image identifier.
    pub image_id: Uuid,
    /// Blob storage path.
    pub path: String,
    /// Public URL of the stored object.
    pub url: String,
}

/// Read-only view of a post.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    /// The post identifier.
    pub post_id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: String,
    /// Number of distinct users who like the post.
    pub like_count: usize,
    pub images: Vec<ImageView>,
    /// Current version; starts at 1 and grows with each edit.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only view of a comment or reply.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    /// The comment identifier.
    pub comment_id: Uuid,
    pub post_id: Uuid,
    /// The comment replied to, absent for top-level comments.
    pub parent_id: Option<Uuid>,
    pub author_id: String,
    pub content: String,
    /// Nesting depth, 0 for top-level comments.
    pub level: u8,
    pub like_count: usize,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

async fn post_view(post: &Post, blobs: &dyn BlobStorage) -> Result<PostView, DomainError> {
    let mut images = Vec::with_capacity(post.images().len());
    for image in post.images() {
        images.push(ImageView {
            image_id: image.id,
            path: image.path.clone(),
            url: blobs.url(&image.path).await?,
        });
    }
    Ok(PostView {
        post_id: post.id,
        title: post.title().to_owned(),
        content: post.content().to_owned(),
        author_id: post.author_id().to_owned(),
        like_count: post.like_count(),
        images,
        version: post.version(),
        created_at: post.created_at,
        updated_at: post.updated_at,
    })
}

fn comment_view(comment: &Comment) -> CommentView {
    CommentView {
        comment_id: comment.id,
        post_id: comment.post_id(),
        parent_id: comment.parent_id(),
        author_id: comment.author_id.clone(),
        content: comment.content().to_owned(),
        level: comment.level(),
        like_count: comment.like_count(),
        version: comment.version(),
        created_at: comment.created_at,
    }
}

/// Retrieves a post by its identifier.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no such post exists, or
/// `DomainError::Storage` on backend failure.
pub async fn get_post(
    post_id: Uuid,
    uow: &SocialUnitOfWork,
    blobs: &dyn BlobStorage,
) -> Result<PostView, DomainError> {
    let mut scope = uow.begin();
    let post = scope.posts().get(post_id).await?;
    post_view(post, blobs).await
}

/// Lists posts matching `filter`, in the filter's order and page.
///
/// # Errors
///
/// Returns `DomainError::Storage` on backend failure.
pub async fn list_posts(
    filter: &PostFilter,
    uow: &SocialUnitOfWork,
    blobs: &dyn BlobStorage,
) -> Result<Vec<PostView>, DomainError> {
    let mut scope = uow.begin();
    let posts = scope.posts().query(filter).await?;
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        views.push(post_view(post, blobs).await?);
    }
    Ok(views)
}

/// Finds every post whose title is exactly `title`, newest first.
///
/// # Errors
///
/// Returns `DomainError::Storage` on backend failure.
pub async fn find_posts_by_title(
    title: &str,
    uow: &SocialUnitOfWork,
    blobs: &dyn BlobStorage,
) -> Result<Vec<PostView>, DomainError> {
    list_posts(&PostFilter::by_title(title), uow, blobs).await
}

/// Retrieves a comment or reply by its identifier.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no such comment exists, or
/// `DomainError::Storage` on backend failure.
pub async fn get_comment(
    comment_id: Uuid,
    uow: &SocialUnitOfWork,
) -> Result<CommentView, DomainError> {
    let mut scope = uow.begin();
    let comment = scope.comments().get(comment_id).await?;
    Ok(comment_view(comment))
}

/// Lists every comment on a post, at all levels, in creation order.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Storage` on backend failure.
pub async fn get_comments(
    post_id: Uuid,
    uow: &SocialUnitOfWork,
) -> Result<Vec<CommentView>, DomainError> {
    let mut scope = uow.begin();
    scope.posts().get(post_id).await?;
    let comments = scope.comments().query(&CommentFilter::for_post(post_id)).await?;
    Ok(comments.into_iter().map(comment_view).collect())
}

/// Lists the direct replies to a comment, in creation order.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the comment does not exist,
/// or `DomainError::Storage` on backend failure.
pub async fn get_replies(
    comment_id: Uuid,
    uow: &SocialUnitOfWork,
) -> Result<Vec<CommentView>, DomainError> {
    let mut scope = uow.begin();
    scope.comments().get(comment_id).await?;
    let replies = scope
        .comments()
        .query(&CommentFilter::replies_to(comment_id))
        .await?;
    Ok(replies.into_iter().map(comment_view).collect())
}
