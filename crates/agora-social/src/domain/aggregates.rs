//! Aggregate roots for the social context.
//!
//! Every behavior method that changes visible state records exactly one
//! event on the aggregate's own outbox before returning. Refused edits and
//! deletes leave state untouched and record a denial event instead.

use agora_core::aggregate::{AggregateRoot, Outbox};
use agora_core::clock::Clock;
use agora_core::error::DomainError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::entities::{Image, ImageUpload, Like, LikeTarget, toggle_like};
use super::events::{
    CommentActionDenied, CommentCreated, CommentDeleted, CommentLiked, CommentReplied,
    CommentUnliked, DeniedAction, PostActionDenied, PostCreated, PostDeleted, PostEdited,
    PostImageAttached, PostLiked, PostUnliked, SocialEvent, SocialEventKind,
};
use super::records::{CommentRecord, PostRecord};

/// Deepest allowed reply level. Top-level comments are level 0.
pub const MAX_COMMENT_LEVEL: u8 = 3;

/// The aggregate root for a post.
#[derive(Debug)]
pub struct Post {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) author_id: String,
    pub(crate) likes: Vec<Like>,
    pub(crate) images: Vec<Image>,
    pub(crate) version: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    outbox: Outbox<SocialEvent>,
}

impl Post {
    /// Creates a post at version 1, recording `PostCreated` with the images
    /// still to upload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if an image has an unusable file
    /// name.
    pub fn create(
        title: &str,
        content: &str,
        author_id: &str,
        images: Vec<ImageUpload>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        for image in &images {
            image.validate()?;
        }

        let now = clock.now();
        let mut post = Self {
            id: Uuid::new_v4(),
            title: title.to_owned(),
            content: content.to_owned(),
            author_id: author_id.to_owned(),
            likes: Vec::new(),
            images: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            outbox: Outbox::new(),
        };
        post.record(
            correlation_id,
            now,
            SocialEventKind::PostCreated(PostCreated {
                post_id: post.id,
                author_id: post.author_id.clone(),
                images,
            }),
        );
        Ok(post)
    }

    /// The post title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The post body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The author's user id.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    /// Number of users currently liking the post.
    #[must_use]
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Returns `true` if `user_id` currently likes the post.
    #[must_use]
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|like| like.user_id == user_id)
    }

    /// Images attached so far.
    #[must_use]
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// Only the author may edit or delete a post.
    #[must_use]
    pub fn can_edit_or_delete(&self, user_id: &str) -> bool {
        user_id == self.author_id
    }

    /// Replaces title and content if `user_id` is the author, bumping the
    /// version and recording `PostEdited`. Otherwise records
    /// `PostActionDenied`. Returns whether the edit happened.
    pub fn edit(
        &mut self,
        user_id: &str,
        title: &str,
        content: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        let now = clock.now();
        if !self.can_edit_or_delete(user_id) {
            self.deny(user_id, DeniedAction::Edit, correlation_id, now);
            return false;
        }

        title.clone_into(&mut self.title);
        content.clone_into(&mut self.content);
        self.version += 1;
        self.updated_at = now;
        self.record(
            correlation_id,
            now,
            SocialEventKind::PostEdited(PostEdited {
                post_id: self.id,
                version: self.version,
            }),
        );
        true
    }

    /// Records `PostDeleted` if `user_id` is the author; the repository delete
    /// removes the row. Otherwise records `PostActionDenied`. Returns whether
    /// the delete happened.
    pub fn delete(&mut self, user_id: &str, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let now = clock.now();
        if !self.can_edit_or_delete(user_id) {
            self.deny(user_id, DeniedAction::Delete, correlation_id, now);
            return false;
        }

        self.record(
            correlation_id,
            now,
            SocialEventKind::PostDeleted(PostDeleted { post_id: self.id }),
        );
        true
    }

    /// Toggles `user_id`'s like, recording `PostLiked` or `PostUnliked`.
    /// Returns `true` if the user now likes the post.
    pub fn like_unlike(&mut self, user_id: &str, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let now = clock.now();
        let liked = toggle_like(&mut self.likes, user_id, LikeTarget::Post(self.id), now);
        let kind = if liked {
            SocialEventKind::PostLiked(PostLiked {
                post_id: self.id,
                user_id: user_id.to_owned(),
            })
        } else {
            SocialEventKind::PostUnliked(PostUnliked {
                post_id: self.id,
                user_id: user_id.to_owned(),
            })
        };
        self.record(correlation_id, now, kind);
        liked
    }

    /// Creates a top-level comment on this post and records
    /// `CommentCreated` here.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the comment cannot be built.
    pub fn comment(
        &mut self,
        author_id: &str,
        content: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Comment, DomainError> {
        let comment = Comment::create(self.id, None, 0, author_id, content, clock)?;
        self.record(
            correlation_id,
            comment.created_at,
            SocialEventKind::CommentCreated(CommentCreated {
                comment_id: comment.id,
                post_id: self.id,
                author_id: author_id.to_owned(),
            }),
        );
        Ok(comment)
    }

    /// Attaches a stored image at `path`, recording `PostImageAttached`.
    pub fn attach_image(&mut self, path: &str, correlation_id: Uuid, clock: &dyn Clock) -> &Image {
        let now = clock.now();
        let image = Image {
            id: Uuid::new_v4(),
            path: path.to_owned(),
        };
        self.record(
            correlation_id,
            now,
            SocialEventKind::PostImageAttached(PostImageAttached {
                post_id: self.id,
                image_id: image.id,
                path: image.path.clone(),
            }),
        );
        self.updated_at = now;
        self.images.push(image);
        &self.images[self.images.len() - 1]
    }

    fn deny(&mut self, user_id: &str, action: DeniedAction, correlation_id: Uuid, now: DateTime<Utc>) {
        self.record(
            correlation_id,
            now,
            SocialEventKind::PostActionDenied(PostActionDenied {
                post_id: self.id,
                user_id: user_id.to_owned(),
                action,
            }),
        );
    }

    fn record(&mut self, correlation_id: Uuid, now: DateTime<Utc>, kind: SocialEventKind) {
        self.outbox
            .record(SocialEvent::new(self.id, correlation_id, now, kind));
    }
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Post {}

impl AggregateRoot for Post {
    type Event = SocialEvent;
    type Record = PostRecord;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn outbox(&self) -> &Outbox<SocialEvent> {
        &self.outbox
    }

    fn outbox_mut(&mut self) -> &mut Outbox<SocialEvent> {
        &mut self.outbox
    }

    fn to_record(&self) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            author_id: self.author_id.clone(),
            likes: self.likes.clone(),
            images: self.images.clone(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_record(record: PostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            author_id: record.author_id,
            likes: record.likes,
            images: record.images,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
            outbox: Outbox::new(),
        }
    }
}

/// The aggregate root for a comment or reply.
#[derive(Debug)]
pub struct Comment {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) post_id: Uuid,
    pub(crate) parent_id: Option<Uuid>,
    pub(crate) author_id: String,
    pub(crate) content: String,
    pub(crate) level: u8,
    pub(crate) likes: Vec<Like>,
    pub(crate) version: i64,
    pub(crate) created_at: DateTime<Utc>,
    outbox: Outbox<SocialEvent>,
}

impl Comment {
    /// Builds a comment at `level` under `post_id`, replying to `parent_id`
    /// when nested. Nothing is recorded; the post or parent comment records
    /// the creation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `level` exceeds
    /// [`MAX_COMMENT_LEVEL`] or a nested comment has no parent.
    pub fn create(
        post_id: Uuid,
        parent_id: Option<Uuid>,
        level: u8,
        author_id: &str,
        content: &str,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if level > MAX_COMMENT_LEVEL {
            return Err(DomainError::Validation(format!(
                "level of a comment or reply must not exceed {MAX_COMMENT_LEVEL}"
            )));
        }
        if level != 0 && parent_id.is_none() {
            return Err(DomainError::Validation(
                "a reply must name the comment it replies to".to_owned(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            post_id,
            parent_id,
            author_id: author_id.to_owned(),
            content: content.to_owned(),
            level,
            likes: Vec::new(),
            version: 1,
            created_at: clock.now(),
            outbox: Outbox::new(),
        })
    }

    /// The post this comment belongs to.
    #[must_use]
    pub fn post_id(&self) -> Uuid {
        self.post_id
    }

    /// The comment replied to, if nested.
    #[must_use]
    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    /// Nesting level; 0 for comments directly on a post.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// The comment body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of users currently liking the comment.
    #[must_use]
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Only the author may delete a comment.
    #[must_use]
    pub fn can_edit_or_delete(&self, user_id: &str) -> bool {
        user_id == self.author_id
    }

    /// Creates a reply one level deeper and records `CommentReplied` here.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the reply would exceed
    /// [`MAX_COMMENT_LEVEL`]. Nothing is recorded in that case.
    pub fn reply(
        &mut self,
        author_id: &str,
        content: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let reply = Self::create(
            self.post_id,
            Some(self.id),
            self.level.saturating_add(1),
            author_id,
            content,
            clock,
        )?;
        self.record(
            correlation_id,
            reply.created_at,
            SocialEventKind::CommentReplied(CommentReplied {
                comment_id: reply.id,
                parent_id: self.id,
                post_id: self.post_id,
                level: reply.level,
            }),
        );
        Ok(reply)
    }

    /// Toggles `user_id`'s like, recording `CommentLiked` or
    /// `CommentUnliked`. Returns `true` if the user now likes the comment.
    pub fn like_unlike(&mut self, user_id: &str, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let now = clock.now();
        let liked = toggle_like(&mut self.likes, user_id, LikeTarget::Comment(self.id), now);
        let kind = if liked {
            SocialEventKind::CommentLiked(CommentLiked {
                comment_id: self.id,
                user_id: user_id.to_owned(),
            })
        } else {
            SocialEventKind::CommentUnliked(CommentUnliked {
                comment_id: self.id,
                user_id: user_id.to_owned(),
            })
        };
        self.record(correlation_id, now, kind);
        liked
    }

    /// Records `CommentDeleted` if `user_id` is the author. Otherwise records
    /// `CommentActionDenied`.
    pub fn delete(&mut self, user_id: &str, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let now = clock.now();
        if !self.can_edit_or_delete(user_id) {
            self.record(
                correlation_id,
                now,
                SocialEventKind::CommentActionDenied(CommentActionDenied {
                    comment_id: self.id,
                    user_id: user_id.to_owned(),
                    action: DeniedAction::Delete,
                }),
            );
            return false;
        }

        self.record(
            correlation_id,
            now,
            SocialEventKind::CommentDeleted(CommentDeleted {
                comment_id: self.id,
                post_id: self.post_id,
            }),
        );
        true
    }

    fn record(&mut self, correlation_id: Uuid, now: DateTime<Utc>, kind: SocialEventKind) {
        self.outbox
            .record(SocialEvent::new(self.id, correlation_id, now, kind));
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Comment {}

impl AggregateRoot for Comment {
    type Event = SocialEvent;
    type Record = CommentRecord;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn outbox(&self) -> &Outbox<SocialEvent> {
        &self.outbox
    }

    fn outbox_mut(&mut self) -> &mut Outbox<SocialEvent> {
        &mut self.outbox
    }

    fn to_record(&self) -> CommentRecord {
        CommentRecord {
            id: self.id,
            post_id: self.post_id,
            parent_id: self.parent_id,
            author_id: self.author_id.clone(),
            content: self.content.clone(),
            level: self.level,
            likes: self.likes.clone(),
            version: self.version,
            created_at: self.created_at,
        }
    }

    fn from_record(record: CommentRecord) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            parent_id: record.parent_id,
            author_id: record.author_id,
            content: record.content,
            level: record.level,
            likes: record.likes,
            version: record.version,
            created_at: record.created_at,
            outbox: Outbox::new(),
        }
    }
}
