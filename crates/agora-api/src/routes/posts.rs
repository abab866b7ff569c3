//! Routes for posts and their likes and comments.

use agora_core::error::DomainError;
use agora_core::message::Message;
use agora_social::application::query_handlers::{self, CommentView, PostView};
use agora_social::domain::commands::{
    CommentPost, CreatePost, DeletePost, EditPost, LikeUnlikePost, SocialCommand,
};
use agora_social::domain::entities::ImageUpload;
use agora_social::domain::events::{SocialEvent, SocialEventKind};
use agora_social::domain::records::{PostFilter, PostOrder};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::UserId;
use crate::routes::comments::created_comment_id;
use crate::routes::refuse_denials;
use crate::state::AppState;

/// An image submitted with a new post.
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub filename: String,
    pub content_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

/// Request body for POST /posts.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<ImageRequest>,
}

/// Request body for PUT /posts/{id}.
#[derive(Debug, Deserialize)]
pub struct EditPostRequest {
    pub title: String,
    pub content: String,
}

/// Request body for POST /posts/{id}/comments and POST /comments/{id}/replies.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Query string for GET /posts.
#[derive(Debug, Deserialize)]
pub struct ListPostsParams {
    pub title: Option<String>,
    pub title_contains: Option<String>,
    pub content_contains: Option<String>,
    pub author_id: Option<String>,
    /// `created_time`, `title`, or either prefixed with `-`.
    pub order: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TryFrom<ListPostsParams> for PostFilter {
    type Error = DomainError;

    fn try_from(params: ListPostsParams) -> Result<Self, Self::Error> {
        Ok(Self {
            title: params.title,
            title_contains: params.title_contains,
            content_contains: params.content_contains,
            author_id: params.author_id,
            order: params
                .order
                .as_deref()
                .map(str::parse::<PostOrder>)
                .transpose()?
                .unwrap_or_default(),
            limit: params.limit,
            offset: params.offset.unwrap_or(0),
        })
    }
}

fn decode_images(images: Vec<ImageRequest>) -> Result<Vec<ImageUpload>, DomainError> {
    images
        .into_iter()
        .map(|image| {
            let data = STANDARD.decode(image.data.as_bytes()).map_err(|e| {
                DomainError::Validation(format!("image {} is not valid base64: {e}", image.filename))
            })?;
            Ok(ImageUpload::new(&image.filename, &image.content_type, data))
        })
        .collect()
}

fn created_post_id(events: &[SocialEvent]) -> Result<Uuid, DomainError> {
    events
        .iter()
        .find_map(|event| match &event.kind {
            SocialEventKind::PostCreated(created) => Some(created.post_id),
            _ => None,
        })
        .ok_or_else(|| DomainError::Configuration("create produced no PostCreated event".into()))
}

async fn send(state: &AppState, command: SocialCommand) -> Result<Vec<SocialEvent>, ApiError> {
    let events = state.bus.handle(Message::Command(command)).await?;
    refuse_denials(&events)?;
    Ok(events)
}

/// POST /posts
#[instrument(skip(state, request), fields(author_id = %user.0))]
async fn create_post(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let command = CreatePost {
        correlation_id: Uuid::new_v4(),
        title: request.title,
        content: request.content,
        author_id: user.0,
        images: decode_images(request.images)?,
    };

    info!(correlation_id = %command.correlation_id, "handling create_post command");

    let events = send(&state, SocialCommand::CreatePost(command)).await?;
    let post_id = created_post_id(&events)?;
    let view = query_handlers::get_post(post_id, &state.reader(), &*state.blob_storage).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /posts
#[instrument(skip(state))]
async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListPostsParams>,
) -> Result<Json<Vec<PostView>>, ApiError> {
    let filter = PostFilter::try_from(params)?;
    let views = query_handlers::list_posts(&filter, &state.reader(), &*state.blob_storage).await?;
    Ok(Json(views))
}

/// GET /posts/{id}
#[instrument(skip(state))]
async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostView>, ApiError> {
    let view = query_handlers::get_post(post_id, &state.reader(), &*state.blob_storage).await?;
    Ok(Json(view))
}

/// PUT /posts/{id}
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn edit_post(
    State(state): State<AppState>,
    user: UserId,
    Path(post_id): Path<Uuid>,
    Json(request): Json<EditPostRequest>,
) -> Result<Json<PostView>, ApiError> {
    let command = EditPost {
        correlation_id: Uuid::new_v4(),
        post_id,
        user_id: user.0,
        title: request.title,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling edit_post command");

    send(&state, SocialCommand::EditPost(command)).await?;
    let view = query_handlers::get_post(post_id, &state.reader(), &*state.blob_storage).await?;
    Ok(Json(view))
}

/// DELETE /posts/{id}
#[instrument(skip(state), fields(user_id = %user.0))]
async fn delete_post(
    State(state): State<AppState>,
    user: UserId,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = DeletePost {
        correlation_id: Uuid::new_v4(),
        post_id,
        user_id: user.0,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_post command");

    send(&state, SocialCommand::DeletePost(command)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /posts/{id}/like
#[instrument(skip(state), fields(user_id = %user.0))]
async fn like_unlike_post(
    State(state): State<AppState>,
    user: UserId,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostView>, ApiError> {
    let command = LikeUnlikePost {
        correlation_id: Uuid::new_v4(),
        post_id,
        user_id: user.0,
    };
    send(&state, SocialCommand::LikeUnlikePost(command)).await?;
    let view = query_handlers::get_post(post_id, &state.reader(), &*state.blob_storage).await?;
    Ok(Json(view))
}

/// POST /posts/{id}/comments
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn comment_post(
    State(state): State<AppState>,
    user: UserId,
    Path(post_id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let command = CommentPost {
        correlation_id: Uuid::new_v4(),
        post_id,
        user_id: user.0,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling comment_post command");

    let events = send(&state, SocialCommand::CommentPost(command)).await?;
    let comment_id = created_comment_id(&events)?;
    let view = query_handlers::get_comment(comment_id, &state.reader()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /posts/{id}/comments
#[instrument(skip(state))]
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let views = query_handlers::get_comments(post_id, &state.reader()).await?;
    Ok(Json(views))
}

/// Returns the router for posts.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post).get(list_posts))
        .route("/posts/{id}", get(get_post).put(edit_post).delete(delete_post))
        .route("/posts/{id}/like", post(like_unlike_post))
        .route("/posts/{id}/comments", post(comment_post).get(list_comments))
}
