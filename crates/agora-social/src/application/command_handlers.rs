//! Command handlers for the social context.
//!
//! Each handler opens one unit-of-work scope, loads what it needs, runs the
//! aggregate behavior and commits. Refused actions are not errors: the
//! aggregate records a denial event, nothing is committed, and the scope
//! forwards the denial when it is dropped.

use agora_core::clock::Clock;
use agora_core::error::DomainError;
use tracing::{info, instrument};

use crate::application::unit_of_work::SocialUnitOfWork;
use crate::domain::aggregates::Post;
use crate::domain::commands::{
    CommentPost, CreatePost, DeleteComment, DeletePost, EditPost, LikeUnlikeComment,
    LikeUnlikePost, ReplyComment,
};

/// Handles `CreatePost`: builds the post and inserts it.
///
/// # Errors
///
/// Returns `DomainError::Validation` for unusable image names, or
/// `DomainError::Storage` if the insert fails.
#[instrument(skip_all, fields(author_id = %command.author_id, images = command.images.len()))]
pub async fn handle_create_post(
    command: &CreatePost,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let post = Post::create(
        &command.title,
        &command.content,
        &command.author_id,
        command.images.clone(),
        command.correlation_id,
        clock,
    )?;
    let post_id = post.id;

    let mut scope = uow.begin();
    scope.posts().add(post);
    scope.commit().await?;

    info!(%post_id, "post created");
    Ok(())
}

/// Handles `EditPost`: edits the post if the user is its author.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Storage` if the update fails.
#[instrument(skip_all, fields(post_id = %command.post_id, user_id = %command.user_id))]
pub async fn handle_edit_post(
    command: &EditPost,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    let edited = scope
        .posts()
        .edit(command.post_id, |post| {
            post.edit(
                &command.user_id,
                &command.title,
                &command.content,
                command.correlation_id,
                clock,
            )
        })
        .await?;

    if edited {
        scope.commit().await?;
    } else {
        info!("post edit refused");
    }
    Ok(())
}

/// Handles `DeletePost`: deletes the post and its comments if the user is
/// its author.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Storage` if the delete fails.
#[instrument(skip_all, fields(post_id = %command.post_id, user_id = %command.user_id))]
pub async fn handle_delete_post(
    command: &DeletePost,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    let post = scope.posts().get(command.post_id).await?;
    if !post.delete(&command.user_id, command.correlation_id, clock) {
        info!("post delete refused");
        return Ok(());
    }

    scope.posts().delete(command.post_id).await?;
    scope.commit().await
}

/// Handles `LikeUnlikePost`: toggles the user's like.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Storage` if the update fails.
pub async fn handle_like_unlike_post(
    command: &LikeUnlikePost,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    scope
        .posts()
        .edit(command.post_id, |post| {
            post.like_unlike(&command.user_id, command.correlation_id, clock)
        })
        .await?;
    scope.commit().await
}

/// Handles `CommentPost`: adds a top-level comment to the post.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Storage` if the insert fails.
pub async fn handle_comment_post(
    command: &CommentPost,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    let post = scope.posts().get(command.post_id).await?;
    let comment = post.comment(
        &command.user_id,
        &command.content,
        command.correlation_id,
        clock,
    )?;
    scope.comments().add(comment);
    scope.commit().await
}

/// Handles `ReplyComment`: adds a reply one level below the comment.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the reply would nest deeper than
/// three levels, `DomainError::AggregateNotFound` if the comment does not
/// exist, or `DomainError::Storage` if the insert fails.
#[instrument(skip_all, fields(comment_id = %command.comment_id, user_id = %command.user_id))]
pub async fn handle_reply_comment(
    command: &ReplyComment,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    let parent = scope.comments().get(command.comment_id).await?;
    let reply = parent.reply(
        &command.user_id,
        &command.content,
        command.correlation_id,
        clock,
    )?;
    scope.comments().add(reply);
    scope.commit().await
}

/// Handles `LikeUnlikeComment`: toggles the user's like.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the comment does not exist,
/// or `DomainError::Storage` if the update fails.
pub async fn handle_like_unlike_comment(
    command: &LikeUnlikeComment,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    scope
        .comments()
        .edit(command.comment_id, |comment| {
            comment.like_unlike(&command.user_id, command.correlation_id, clock)
        })
        .await?;
    scope.commit().await
}

/// Handles `DeleteComment`: deletes the comment and its replies if the user
/// is its author.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the comment does not exist,
/// or `DomainError::Storage` if the delete fails.
#[instrument(skip_all, fields(comment_id = %command.comment_id, user_id = %command.user_id))]
pub async fn handle_delete_comment(
    command: &DeleteComment,
    uow: &SocialUnitOfWork,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let mut scope = uow.begin();
    let comment = scope.comments().get(command.comment_id).await?;
    if !comment.delete(&command.user_id, command.correlation_id, clock) {
        info!("comment delete refused");
        return Ok(());
    }

    scope.comments().delete(command.comment_id).await?;
    scope.commit().await
}
