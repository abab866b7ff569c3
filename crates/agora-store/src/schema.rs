//! Social store database schema.

use agora_core::error::DomainError;
use sqlx::PgPool;

/// SQL creating every social table. Mirrors `migrations/0001_social.sql`.
pub const CREATE_SOCIAL_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS posts (
    id          UUID PRIMARY KEY,
    seq         BIGSERIAL NOT NULL,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    author_id   TEXT NOT NULL,
    version     BIGINT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_title ON posts (title);
CREATE INDEX IF NOT EXISTS idx_posts_created ON posts (created_at, seq);

CREATE TABLE IF NOT EXISTS post_likes (
    id          UUID PRIMARY KEY,
    seq         BIGSERIAL NOT NULL,
    post_id     UUID NOT NULL REFERENCES posts (id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    UNIQUE (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS post_images (
    id          UUID PRIMARY KEY,
    seq         BIGSERIAL NOT NULL,
    post_id     UUID NOT NULL REFERENCES posts (id) ON DELETE CASCADE,
    path        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id          UUID PRIMARY KEY,
    seq         BIGSERIAL NOT NULL,
    post_id     UUID NOT NULL REFERENCES posts (id) ON DELETE CASCADE,
    parent_id   UUID REFERENCES comments (id) ON DELETE CASCADE,
    author_id   TEXT NOT NULL,
    content     TEXT NOT NULL,
    level       SMALLINT NOT NULL CHECK (level BETWEEN 0 AND 3),
    version     BIGINT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments (post_id, created_at, seq);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments (parent_id);

CREATE TABLE IF NOT EXISTS comment_likes (
    id          UUID PRIMARY KEY,
    seq         BIGSERIAL NOT NULL,
    comment_id  UUID NOT NULL REFERENCES comments (id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    UNIQUE (comment_id, user_id)
);
";

/// Creates the social tables if they do not exist yet.
///
/// # Errors
///
/// Returns `DomainError::Storage` if a statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::raw_sql(CREATE_SOCIAL_TABLES)
        .execute(pool)
        .await
        .map_err(DomainError::storage)?;
    Ok(())
}
