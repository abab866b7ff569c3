//! Event handlers for the social context.
//!
//! These run after the triggering command's scope has committed. Failures
//! here are logged by the bus and do not reach the caller.

use agora_core::blob_storage::BlobStorage;
use agora_core::clock::Clock;
use agora_core::error::DomainError;
use agora_core::event::DomainEvent;
use agora_core::publisher::{EventPublisher, PublishedEvent};
use tracing::{info, warn};

use crate::application::unit_of_work::SocialUnitOfWork;
use crate::domain::events::{SocialEvent, SocialEventKind};

/// Stores the images submitted with a new post and attaches each stored one.
///
/// An image whose upload fails is logged and skipped; the remaining images
/// are still stored and attached.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post was deleted before
/// its images were attached, or `DomainError::Storage` if the commit fails.
pub async fn upload_post_images(
    event: &SocialEvent,
    uow: &SocialUnitOfWork,
    blobs: &dyn BlobStorage,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    let SocialEventKind::PostCreated(created) = &event.kind else {
        return Ok(());
    };
    if created.images.is_empty() {
        return Ok(());
    }

    let correlation_id = event.metadata.correlation_id;
    let mut scope = uow.begin();
    // Nothing is uploaded for a post that is already gone.
    scope.posts().get(created.post_id).await?;
    for upload in &created.images {
        let path = upload.storage_path(created.post_id);
        if let Err(err) = blobs.put(&path, &upload.data, &upload.content_type).await {
            warn!(post_id = %created.post_id, %path, error = %err, "image upload failed, skipping");
            continue;
        }
        scope
            .posts()
            .edit(created.post_id, |post| {
                post.attach_image(&path, correlation_id, clock);
            })
            .await?;
        info!(post_id = %created.post_id, %path, "image stored");
    }
    scope.commit().await
}

/// Writes an audit line for a refused edit or delete.
///
/// Never fails: the refusal has already been recorded and the caller is
/// told through the returned events.
///
/// # Errors
///
/// Infallible; the `Result` keeps the handler signature uniform.
pub async fn audit_permission_denied(event: &SocialEvent) -> Result<(), DomainError> {
    match &event.kind {
        SocialEventKind::PostActionDenied(denied) => warn!(
            post_id = %denied.post_id,
            user_id = %denied.user_id,
            action = ?denied.action,
            "permission denied on post"
        ),
        SocialEventKind::CommentActionDenied(denied) => warn!(
            comment_id = %denied.comment_id,
            user_id = %denied.user_id,
            action = ?denied.action,
            "permission denied on comment"
        ),
        _ => {}
    }
    Ok(())
}

/// Forwards the event to the pub/sub transport on a channel named after its
/// type.
///
/// # Errors
///
/// Returns the publisher's error if the transport rejects the message.
pub async fn publish_event(
    event: &SocialEvent,
    publisher: &dyn EventPublisher,
) -> Result<(), DomainError> {
    publisher
        .publish(event.event_type(), &PublishedEvent::from_event(event))
        .await
}
