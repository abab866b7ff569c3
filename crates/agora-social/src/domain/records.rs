//! Persistence records and query filters for posts and comments.

use std::cmp::Ordering;
use std::str::FromStr;

use agora_core::error::DomainError;
use agora_core::repository::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{Image, Like};

/// Stored form of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub likes: Vec<Like>,
    pub images: Vec<Image>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PostRecord {
    type Filter = PostFilter;

    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Stored form of a comment or reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: String,
    pub content: String,
    pub level: u8,
    pub likes: Vec<Like>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for CommentRecord {
    type Filter = CommentFilter;

    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Sort key for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    /// Oldest first.
    CreatedAsc,
    /// Newest first.
    #[default]
    CreatedDesc,
    /// Title, A to Z.
    TitleAsc,
    /// Title, Z to A.
    TitleDesc,
}

impl FromStr for PostOrder {
    type Err = DomainError;

    /// Parses `created_time`, `title`, optionally prefixed with `-` for
    /// descending order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_time" => Ok(Self::CreatedAsc),
            "-created_time" => Ok(Self::CreatedDesc),
            "title" => Ok(Self::TitleAsc),
            "-title" => Ok(Self::TitleDesc),
            other => Err(DomainError::Validation(format!(
                "unsupported order key: {other}"
            ))),
        }
    }
}

impl PostOrder {
    /// Compares two records under this order. Ties keep insertion order when
    /// used with a stable sort.
    #[must_use]
    pub fn compare(self, a: &PostRecord, b: &PostRecord) -> Ordering {
        match self {
            Self::CreatedAsc => a.created_at.cmp(&b.created_at),
            Self::CreatedDesc => b.created_at.cmp(&a.created_at),
            Self::TitleAsc => a.title.cmp(&b.title),
            Self::TitleDesc => b.title.cmp(&a.title),
        }
    }
}

/// Criteria for querying posts. Empty criteria match every post.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Exact title.
    pub title: Option<String>,
    /// Substring of the title.
    pub title_contains: Option<String>,
    /// Substring of the content.
    pub content_contains: Option<String>,
    /// Exact author.
    pub author_id: Option<String>,
    pub order: PostOrder,
    /// Maximum number of posts returned.
    pub limit: Option<u32>,
    /// Number of matching posts skipped.
    pub offset: u32,
}

impl PostFilter {
    /// Matches posts with exactly `title`.
    #[must_use]
    pub fn by_title(title: &str) -> Self {
        Self {
            title: Some(title.to_owned()),
            ..Self::default()
        }
    }

    /// Returns `true` if `record` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, record: &PostRecord) -> bool {
        self.title.as_ref().is_none_or(|t| record.title == *t)
            && self
                .title_contains
                .as_ref()
                .is_none_or(|t| record.title.contains(t.as_str()))
            && self
                .content_contains
                .as_ref()
                .is_none_or(|c| record.content.contains(c.as_str()))
            && self
                .author_id
                .as_ref()
                .is_none_or(|a| record.author_id == *a)
    }
}

/// Criteria for querying comments. Results are ordered by creation time,
/// then insertion order.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    /// Comments on this post, at any level.
    pub post_id: Option<Uuid>,
    /// Direct replies to this comment.
    pub parent_id: Option<Uuid>,
    /// Comments by this author.
    pub author_id: Option<String>,
}

impl CommentFilter {
    /// Every comment on `post_id`.
    #[must_use]
    pub fn for_post(post_id: Uuid) -> Self {
        Self {
            post_id: Some(post_id),
            ..Self::default()
        }
    }

    /// Direct replies to `comment_id`.
    #[must_use]
    pub fn replies_to(comment_id: Uuid) -> Self {
        Self {
            parent_id: Some(comment_id),
            ..Self::default()
        }
    }

    /// Returns `true` if `record` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, record: &CommentRecord) -> bool {
        self.post_id.is_none_or(|p| record.post_id == p)
            && self.parent_id.is_none_or(|p| record.parent_id == Some(p))
            && self
                .author_id
                .as_ref()
                .is_none_or(|a| record.author_id == *a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::clock::Clock;
    use agora_test_support::fixed_clock;

    fn post(title: &str, content: &str, author: &str) -> PostRecord {
        let now = fixed_clock().now();
        PostRecord {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            author_id: author.into(),
            likes: vec![],
            images: vec![],
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_keys_parse() {
        assert_eq!("-created_time".parse::<PostOrder>().unwrap(), PostOrder::CreatedDesc);
        assert_eq!("created_time".parse::<PostOrder>().unwrap(), PostOrder::CreatedAsc);
        assert_eq!("-title".parse::<PostOrder>().unwrap(), PostOrder::TitleDesc);
        assert!(matches!(
            "likes".parse::<PostOrder>(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_post_filter_combines_criteria() {
        // Arrange
        let filter = PostFilter {
            title_contains: Some("rust".into()),
            author_id: Some("u1".into()),
            ..PostFilter::default()
        };

        // Act / Assert
        assert!(filter.matches(&post("learning rust", "", "u1")));
        assert!(!filter.matches(&post("learning rust", "", "u2")));
        assert!(!filter.matches(&post("learning go", "", "u1")));
        assert!(PostFilter::default().matches(&post("anything", "", "anyone")));
    }

    #[test]
    fn test_comment_filter_selects_direct_replies() {
        let now = fixed_clock().now();
        let parent = Uuid::new_v4();
        let reply = CommentRecord {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            parent_id: Some(parent),
            author_id: "u3".into(),
            content: "re".into(),
            level: 1,
            likes: vec![],
            version: 1,
            created_at: now,
        };

        assert!(CommentFilter::replies_to(parent).matches(&reply));
        assert!(!CommentFilter::replies_to(Uuid::new_v4()).matches(&reply));
        assert!(CommentFilter::for_post(reply.post_id).matches(&reply));
    }
}
