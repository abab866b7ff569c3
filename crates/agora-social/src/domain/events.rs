//! Domain events for the social context.

use agora_core::event::{DomainEvent, EventMetadata};
use agora_core::message::{MessageKind, Routable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::ImageUpload;

/// The action a denied user attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedAction {
    /// Changing title or content.
    Edit,
    /// Removing the aggregate.
    Delete,
}

/// Emitted when a post is created. Carries the uploads still to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreated {
    /// The new post.
    pub post_id: Uuid,
    /// The author.
    pub author_id: String,
    /// Images submitted with the post.
    pub images: Vec<ImageUpload>,
}

/// Emitted when the author edits a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEdited {
    /// The edited post.
    pub post_id: Uuid,
    /// Version after the edit.
    pub version: i64,
}

/// Emitted when the author deletes a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDeleted {
    /// The deleted post.
    pub post_id: Uuid,
}

/// Emitted when a user likes a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLiked {
    /// The liked post.
    pub post_id: Uuid,
    /// The liking user.
    pub user_id: String,
}

/// Emitted when a user withdraws a like from a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUnliked {
    /// The post.
    pub post_id: Uuid,
    /// The user.
    pub user_id: String,
}

/// Emitted when an uploaded image is attached to a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostImageAttached {
    /// The post.
    pub post_id: Uuid,
    /// The new image.
    pub image_id: Uuid,
    /// Blob storage path of the image.
    pub path: String,
}

/// Emitted when a non-author tries to edit or delete a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostActionDenied {
    /// The post.
    pub post_id: Uuid,
    /// The acting user.
    pub user_id: String,
    /// What they attempted.
    pub action: DeniedAction,
}

/// Emitted when a top-level comment is added to a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreated {
    /// The new comment.
    pub comment_id: Uuid,
    /// The commented post.
    pub post_id: Uuid,
    /// The comment author.
    pub author_id: String,
}

/// Emitted when a reply is added to a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentReplied {
    /// The new reply.
    pub comment_id: Uuid,
    /// The comment replied to.
    pub parent_id: Uuid,
    /// The post the thread belongs to.
    pub post_id: Uuid,
    /// Nesting level of the reply.
    pub level: u8,
}

/// Emitted when a user likes a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentLiked {
    /// The liked comment.
    pub comment_id: Uuid,
    /// The liking user.
    pub user_id: String,
}

/// Emitted when a user withdraws a like from a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentUnliked {
    /// The comment.
    pub comment_id: Uuid,
    /// The user.
    pub user_id: String,
}

/// Emitted when the author deletes a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDeleted {
    /// The deleted comment.
    pub comment_id: Uuid,
    /// The post the comment belonged to.
    pub post_id: Uuid,
}

/// Emitted when a non-author tries to delete a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentActionDenied {
    /// The comment.
    pub comment_id: Uuid,
    /// The acting user.
    pub user_id: String,
    /// What they attempted.
    pub action: DeniedAction,
}

/// Event payload variants for the social context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SocialEventKind {
    /// A post was created.
    PostCreated(PostCreated),
    /// A post was edited.
    PostEdited(PostEdited),
    /// A post was deleted.
    PostDeleted(PostDeleted),
    /// A post was liked.
    PostLiked(PostLiked),
    /// A post like was withdrawn.
    PostUnliked(PostUnliked),
    /// An image was attached to a post.
    PostImageAttached(PostImageAttached),
    /// A post action was refused.
    PostActionDenied(PostActionDenied),
    /// A comment was added to a post.
    CommentCreated(CommentCreated),
    /// A reply was added to a comment.
    CommentReplied(CommentReplied),
    /// A comment was liked.
    CommentLiked(CommentLiked),
    /// A comment like was withdrawn.
    CommentUnliked(CommentUnliked),
    /// A comment was deleted.
    CommentDeleted(CommentDeleted),
    /// A comment action was refused.
    CommentActionDenied(CommentActionDenied),
}

/// Routing tag for [`SocialEventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PostCreated,
    PostEdited,
    PostDeleted,
    PostLiked,
    PostUnliked,
    PostImageAttached,
    PostActionDenied,
    CommentCreated,
    CommentReplied,
    CommentLiked,
    CommentUnliked,
    CommentDeleted,
    CommentActionDenied,
}

impl MessageKind for EventKind {
    fn all() -> &'static [Self] {
        &[
            Self::PostCreated,
            Self::PostEdited,
            Self::PostDeleted,
            Self::PostLiked,
            Self::PostUnliked,
            Self::PostImageAttached,
            Self::PostActionDenied,
            Self::CommentCreated,
            Self::CommentReplied,
            Self::CommentLiked,
            Self::CommentUnliked,
            Self::CommentDeleted,
            Self::CommentActionDenied,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::PostCreated => "social.post_created",
            Self::PostEdited => "social.post_edited",
            Self::PostDeleted => "social.post_deleted",
            Self::PostLiked => "social.post_liked",
            Self::PostUnliked => "social.post_unliked",
            Self::PostImageAttached => "social.post_image_attached",
            Self::PostActionDenied => "social.post_action_denied",
            Self::CommentCreated => "social.comment_created",
            Self::CommentReplied => "social.comment_replied",
            Self::CommentLiked => "social.comment_liked",
            Self::CommentUnliked => "social.comment_unliked",
            Self::CommentDeleted => "social.comment_deleted",
            Self::CommentActionDenied => "social.comment_action_denied",
        }
    }
}

impl SocialEventKind {
    /// Returns the routing tag of this payload.
    #[must_use]
    pub fn tag(&self) -> EventKind {
        match self {
            Self::PostCreated(_) => EventKind::PostCreated,
            Self::PostEdited(_) => EventKind::PostEdited,
            Self::PostDeleted(_) => EventKind::PostDeleted,
            Self::PostLiked(_) => EventKind::PostLiked,
            Self::PostUnliked(_) => EventKind::PostUnliked,
            Self::PostImageAttached(_) => EventKind::PostImageAttached,
            Self::PostActionDenied(_) => EventKind::PostActionDenied,
            Self::CommentCreated(_) => EventKind::CommentCreated,
            Self::CommentReplied(_) => EventKind::CommentReplied,
            Self::CommentLiked(_) => EventKind::CommentLiked,
            Self::CommentUnliked(_) => EventKind::CommentUnliked,
            Self::CommentDeleted(_) => EventKind::CommentDeleted,
            Self::CommentActionDenied(_) => EventKind::CommentActionDenied,
        }
    }
}

/// Domain event envelope for the social context.
#[derive(Debug, Clone)]
pub struct SocialEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SocialEventKind,
}

impl SocialEvent {
    /// Wraps a payload recorded by `aggregate_id` at `occurred_at`.
    #[must_use]
    pub fn new(
        aggregate_id: Uuid,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
        kind: SocialEventKind,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(
                kind.tag().name(),
                aggregate_id,
                correlation_id,
                occurred_at,
            ),
            kind,
        }
    }

    /// Returns `true` for the events that record a refused action.
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(
            self.kind,
            SocialEventKind::PostActionDenied(_) | SocialEventKind::CommentActionDenied(_)
        )
    }
}

impl Routable for SocialEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        self.kind.tag()
    }
}

impl DomainEvent for SocialEvent {
    fn event_type(&self) -> &'static str {
        self.kind.tag().name()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Derived Serialize on plain data does not fail.
        serde_json::to_value(&self.kind).unwrap_or_default()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::clock::Clock;
    use agora_test_support::fixed_clock;

    #[test]
    fn test_every_event_kind_has_a_distinct_name() {
        let mut names: Vec<&str> = EventKind::all().iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventKind::all().len());
    }

    #[test]
    fn test_new_stamps_metadata_from_payload() {
        // Arrange
        let post_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let now = fixed_clock().now();

        // Act
        let event = SocialEvent::new(
            post_id,
            correlation_id,
            now,
            SocialEventKind::PostDeleted(PostDeleted { post_id }),
        );

        // Assert
        assert_eq!(event.event_type(), "social.post_deleted");
        assert_eq!(event.metadata.event_type, "social.post_deleted");
        assert_eq!(event.metadata.aggregate_id, post_id);
        assert_eq!(event.metadata.causation_id, correlation_id);
        assert_eq!(event.metadata.occurred_at, now);
        assert!(!event.is_denial());
    }

    #[test]
    fn test_payload_omits_image_bytes() {
        let post_id = Uuid::new_v4();
        let event = SocialEvent::new(
            post_id,
            Uuid::nil(),
            fixed_clock().now(),
            SocialEventKind::PostCreated(PostCreated {
                post_id,
                author_id: "u1".into(),
                images: vec![ImageUpload::new("a.png", "image/png", vec![1, 2, 3])],
            }),
        );

        let payload = event.to_payload();

        let image = &payload["PostCreated"]["images"][0];
        assert_eq!(image["filename"], "a.png");
        assert!(image.get("data").is_none());
    }

    #[test]
    fn test_denials_are_flagged() {
        let comment_id = Uuid::new_v4();
        let event = SocialEvent::new(
            comment_id,
            Uuid::nil(),
            fixed_clock().now(),
            SocialEventKind::CommentActionDenied(CommentActionDenied {
                comment_id,
                user_id: "intruder".into(),
                action: DeniedAction::Delete,
            }),
        );

        assert!(event.is_denial());
        assert_eq!(event.kind(), EventKind::CommentActionDenied);
    }
}
