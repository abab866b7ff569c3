//! Commands for the social context.

use agora_core::command::Command;
use agora_core::message::{MessageKind, Routable};
use uuid::Uuid;

use super::entities::ImageUpload;

/// Command to publish a new post.
#[derive(Debug, Clone)]
pub struct CreatePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub title: String,
    pub content: String,
    /// The author; becomes the only user allowed to edit or delete.
    pub author_id: String,
    /// Images to upload once the post exists.
    pub images: Vec<ImageUpload>,
}

/// Command to change a post's title and content.
#[derive(Debug, Clone)]
pub struct EditPost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub post_id: Uuid,
    /// The acting user.
    pub user_id: String,
    pub title: String,
    pub content: String,
}

/// Command to delete a post.
#[derive(Debug, Clone)]
pub struct DeletePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub post_id: Uuid,
    /// The acting user.
    pub user_id: String,
}

/// Command to toggle a user's like on a post.
#[derive(Debug, Clone)]
pub struct LikeUnlikePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub post_id: Uuid,
    /// The liking user.
    pub user_id: String,
}

/// Command to add a top-level comment to a post.
#[derive(Debug, Clone)]
pub struct CommentPost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub post_id: Uuid,
    /// The comment author.
    pub user_id: String,
    pub content: String,
}

/// Command to reply to a comment.
#[derive(Debug, Clone)]
pub struct ReplyComment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The comment replied to.
    pub comment_id: Uuid,
    /// The reply author.
    pub user_id: String,
    pub content: String,
}

/// Command to toggle a user's like on a comment.
#[derive(Debug, Clone)]
pub struct LikeUnlikeComment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub comment_id: Uuid,
    /// The liking user.
    pub user_id: String,
}

/// Command to delete a comment and its replies.
#[derive(Debug, Clone)]
pub struct DeleteComment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub comment_id: Uuid,
    /// The acting user.
    pub user_id: String,
}

/// Every command the social context accepts.
#[derive(Debug, Clone)]
pub enum SocialCommand {
    CreatePost(CreatePost),
    EditPost(EditPost),
    DeletePost(DeletePost),
    LikeUnlikePost(LikeUnlikePost),
    CommentPost(CommentPost),
    ReplyComment(ReplyComment),
    LikeUnlikeComment(LikeUnlikeComment),
    DeleteComment(DeleteComment),
}

/// Routing tag for [`SocialCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreatePost,
    EditPost,
    DeletePost,
    LikeUnlikePost,
    CommentPost,
    ReplyComment,
    LikeUnlikeComment,
    DeleteComment,
}

impl MessageKind for CommandKind {
    fn all() -> &'static [Self] {
        &[
            Self::CreatePost,
            Self::EditPost,
            Self::DeletePost,
            Self::LikeUnlikePost,
            Self::CommentPost,
            Self::ReplyComment,
            Self::LikeUnlikeComment,
            Self::DeleteComment,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::CreatePost => "social.create_post",
            Self::EditPost => "social.edit_post",
            Self::DeletePost => "social.delete_post",
            Self::LikeUnlikePost => "social.like_unlike_post",
            Self::CommentPost => "social.comment_post",
            Self::ReplyComment => "social.reply_comment",
            Self::LikeUnlikeComment => "social.like_unlike_comment",
            Self::DeleteComment => "social.delete_comment",
        }
    }
}

impl Routable for SocialCommand {
    type Kind = CommandKind;

    fn kind(&self) -> CommandKind {
        match self {
            Self::CreatePost(_) => CommandKind::CreatePost,
            Self::EditPost(_) => CommandKind::EditPost,
            Self::DeletePost(_) => CommandKind::DeletePost,
            Self::LikeUnlikePost(_) => CommandKind::LikeUnlikePost,
            Self::CommentPost(_) => CommandKind::CommentPost,
            Self::ReplyComment(_) => CommandKind::ReplyComment,
            Self::LikeUnlikeComment(_) => CommandKind::LikeUnlikeComment,
            Self::DeleteComment(_) => CommandKind::DeleteComment,
        }
    }
}

impl Command for SocialCommand {
    fn command_type(&self) -> &'static str {
        self.kind().name()
    }

    fn correlation_id(&self) -> Uuid {
        match self {
            Self::CreatePost(c) => c.correlation_id,
            Self::EditPost(c) => c.correlation_id,
            Self::DeletePost(c) => c.correlation_id,
            Self::LikeUnlikePost(c) => c.correlation_id,
            Self::CommentPost(c) => c.correlation_id,
            Self::ReplyComment(c) => c.correlation_id,
            Self::LikeUnlikeComment(c) => c.correlation_id,
            Self::DeleteComment(c) => c.correlation_id,
        }
    }
}
