//! Routes for comments, replies and comment likes.

use agora_core::error::DomainError;
use agora_core::message::Message;
use agora_social::application::query_handlers::{self, CommentView};
use agora_social::domain::commands::{
    DeleteComment, LikeUnlikeComment, ReplyComment, SocialCommand,
};
use agora_social::domain::events::{SocialEvent, SocialEventKind};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::UserId;
use crate::routes::posts::CommentRequest;
use crate::routes::refuse_denials;
use crate::state::AppState;

/// Id of the comment or reply a command created.
pub(crate) fn created_comment_id(events: &[SocialEvent]) -> Result<Uuid, DomainError> {
    events
        .iter()
        .find_map(|event| match &event.kind {
            SocialEventKind::CommentCreated(created) => Some(created.comment_id),
            SocialEventKind::CommentReplied(replied) => Some(replied.comment_id),
            _ => None,
        })
        .ok_or_else(|| DomainError::Configuration("command produced no comment event".into()))
}

async fn dispatch(state: &AppState, command: SocialCommand) -> Result<Vec<SocialEvent>, ApiError> {
    let events = state.bus.handle(Message::Command(command)).await?;
    refuse_denials(&events)?;
    Ok(events)
}

/// GET /comments/{id}
#[instrument(skip(state))]
async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentView>, ApiError> {
    Ok(Json(
        query_handlers::get_comment(comment_id, &state.reader()).await?,
    ))
}

/// DELETE /comments/{id}
#[instrument(skip(state), fields(user_id = %user.0))]
async fn delete_comment(
    State(state): State<AppState>,
    user: UserId,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = DeleteComment {
        correlation_id: Uuid::new_v4(),
        comment_id,
        user_id: user.0,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_comment command");

    dispatch(&state, SocialCommand::DeleteComment(command)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /comments/{id}/like
#[instrument(skip(state), fields(user_id = %user.0))]
async fn like_unlike_comment(
    State(state): State<AppState>,
    user: UserId,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentView>, ApiError> {
    let command = LikeUnlikeComment {
        correlation_id: Uuid::new_v4(),
        comment_id,
        user_id: user.0,
    };
    dispatch(&state, SocialCommand::LikeUnlikeComment(command)).await?;
    Ok(Json(
        query_handlers::get_comment(comment_id, &state.reader()).await?,
    ))
}

/// POST /comments/{id}/replies
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn reply_comment(
    State(state): State<AppState>,
    user: UserId,
    Path(comment_id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let command = ReplyComment {
        correlation_id: Uuid::new_v4(),
        comment_id,
        user_id: user.0,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling reply_comment command");

    let events = dispatch(&state, SocialCommand::ReplyComment(command)).await?;
    let reply_id = created_comment_id(&events)?;
    let view = query_handlers::get_comment(reply_id, &state.reader()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /comments/{id}/replies
#[instrument(skip(state))]
async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    Ok(Json(
        query_handlers::get_replies(comment_id, &state.reader()).await?,
    ))
}

/// Returns the router for comments.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/{id}", get(get_comment).delete(delete_comment))
        .route("/comments/{id}/like", post(like_unlike_comment))
        .route("/comments/{id}/replies", post(reply_comment).get(list_replies))
}
