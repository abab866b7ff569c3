//! Child entities and value objects owned by posts and comments.

use agora_core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LikeTarget {
    /// A post.
    Post(Uuid),
    /// A comment.
    Comment(Uuid),
}

/// A user's like on a post or comment.
///
/// Two likes are equal when the same user liked the same target, whatever
/// their ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    /// Like identifier.
    pub id: Uuid,
    /// The liking user.
    pub user_id: String,
    /// The liked post or comment.
    pub target: LikeTarget,
    /// When the like was given.
    pub created_at: DateTime<Utc>,
}

impl Like {
    /// Creates a like by `user_id` on `target`.
    #[must_use]
    pub fn new(user_id: &str, target: LikeTarget, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            target,
            created_at,
        }
    }
}

impl PartialEq for Like {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id && self.target == other.target
    }
}

impl Eq for Like {}

/// Toggles `user_id`'s like in `likes`. Returns `true` if the user now likes
/// the target.
pub(crate) fn toggle_like(
    likes: &mut Vec<Like>,
    user_id: &str,
    target: LikeTarget,
    now: DateTime<Utc>,
) -> bool {
    let like = Like::new(user_id, target, now);
    if let Some(position) = likes.iter().position(|existing| *existing == like) {
        likes.remove(position);
        false
    } else {
        likes.push(like);
        true
    }
}

/// An image stored in blob storage and attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image identifier.
    pub id: Uuid,
    /// Blob storage path.
    pub path: String,
}

/// An image submitted with a new post, not yet stored.
///
/// The bytes travel in memory with the `PostCreated` event but are never
/// serialized into event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    /// Original file name, used as the last path segment.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Raw bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Creates an upload.
    #[must_use]
    pub fn new(filename: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            filename: filename.to_owned(),
            content_type: content_type.to_owned(),
            data,
        }
    }

    /// Checks that the file name is a single, plain path segment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for empty names, names containing a
    /// path separator, and `.`/`..`.
    pub fn validate(&self) -> Result<(), DomainError> {
        let name = self.filename.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DomainError::Validation(format!(
                "invalid image file name: {name:?}"
            )));
        }
        Ok(())
    }

    /// Blob storage path for this upload under `post_id`.
    #[must_use]
    pub fn storage_path(&self, post_id: Uuid) -> String {
        format!("posts/{post_id}/{}", self.filename)
    }
}
