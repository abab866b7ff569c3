//! `PostgreSQL` implementation of the `SocialStore` port.
//!
//! Every transaction owns one pooled connection for its lifetime. Likes and
//! images live in child tables and are rewritten with their owner on update.

use std::collections::HashMap;

use agora_core::error::DomainError;
use agora_core::repository::TableGateway;
use agora_social::domain::entities::{Image, Like, LikeTarget};
use agora_social::domain::records::{
    CommentFilter, CommentRecord, PostFilter, PostOrder, PostRecord,
};
use agora_social::domain::store::{SocialStore, SocialTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

/// PostgreSQL-backed social store.
#[derive(Debug, Clone)]
pub struct PgSocialStore {
    pool: PgPool,
}

impl PgSocialStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(DomainError::storage)?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SocialStore for PgSocialStore {
    async fn begin(&self) -> Result<Box<dyn SocialTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(DomainError::storage)?;
        debug!("postgres transaction opened");
        Ok(Box::new(PgTransaction { tx }))
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    author_id: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    parent_id: Option<Uuid>,
    author_id: String,
    content: String,
    level: i16,
    version: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LikeRow {
    owner_id: Uuid,
    id: Uuid,
    user_id: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    post_id: Uuid,
    id: Uuid,
    path: String,
}

const POST_COLUMNS: &str = "id, title, content, author_id, version, created_at, updated_at";
const COMMENT_COLUMNS: &str =
    "id, post_id, parent_id, author_id, content, level, version, created_at";

fn order_clause(order: PostOrder) -> &'static str {
    match order {
        PostOrder::CreatedAsc => "created_at ASC, seq ASC",
        PostOrder::CreatedDesc => "created_at DESC, seq ASC",
        PostOrder::TitleAsc => "title COLLATE \"C\" ASC, seq ASC",
        PostOrder::TitleDesc => "title COLLATE \"C\" DESC, seq ASC",
    }
}

fn group_likes(rows: Vec<LikeRow>, target: fn(Uuid) -> LikeTarget) -> HashMap<Uuid, Vec<Like>> {
    let mut grouped: HashMap<Uuid, Vec<Like>> = HashMap::new();
    for row in rows {
        grouped.entry(row.owner_id).or_default().push(Like {
            id: row.id,
            user_id: row.user_id,
            target: target(row.owner_id),
            created_at: row.created_at,
        });
    }
    grouped
}

fn comment_record(row: CommentRow, likes: Vec<Like>) -> Result<CommentRecord, DomainError> {
    Ok(CommentRecord {
        id: row.id,
        post_id: row.post_id,
        parent_id: row.parent_id,
        author_id: row.author_id,
        content: row.content,
        level: u8::try_from(row.level).map_err(DomainError::storage)?,
        likes,
        version: row.version,
        created_at: row.created_at,
    })
}

/// One open `PostgreSQL` transaction.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTransaction {
    async fn post_rows(&mut self, filter: &PostFilter) -> Result<Vec<PostRow>, DomainError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(POST_COLUMNS).push(" FROM posts WHERE TRUE");
        if let Some(title) = &filter.title {
            query.push(" AND title = ").push_bind(title.clone());
        }
        if let Some(fragment) = &filter.title_contains {
            query
                .push(" AND strpos(title, ")
                .push_bind(fragment.clone())
                .push(") > 0");
        }
        if let Some(fragment) = &filter.content_contains {
            query
                .push(" AND strpos(content, ")
                .push_bind(fragment.clone())
                .push(") > 0");
        }
        if let Some(author_id) = &filter.author_id {
            query.push(" AND author_id = ").push_bind(author_id.clone());
        }
        query.push(" ORDER BY ").push(order_clause(filter.order));
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }
        query.push(" OFFSET ").push_bind(i64::from(filter.offset));

        query
            .build_query_as::<PostRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DomainError::storage)
    }

    async fn posts_with_children(
        &mut self,
        rows: Vec<PostRow>,
    ) -> Result<Vec<PostRecord>, DomainError> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let like_rows: Vec<LikeRow> = sqlx::query_as(
            "SELECT post_id AS owner_id, id, user_id, created_at FROM post_likes
             WHERE post_id = ANY($1) ORDER BY created_at, seq",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;
        let image_rows: Vec<ImageRow> = sqlx::query_as(
            "SELECT post_id, id, path FROM post_images WHERE post_id = ANY($1) ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;

        let mut likes = group_likes(like_rows, LikeTarget::Post);
        let mut images: HashMap<Uuid, Vec<Image>> = HashMap::new();
        for row in image_rows {
            images.entry(row.post_id).or_default().push(Image {
                id: row.id,
                path: row.path,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| PostRecord {
                likes: likes.remove(&row.id).unwrap_or_default(),
                images: images.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                content: row.content,
                author_id: row.author_id,
                version: row.version,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn comments_with_likes(
        &mut self,
        rows: Vec<CommentRow>,
    ) -> Result<Vec<CommentRecord>, DomainError> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let like_rows: Vec<LikeRow> = sqlx::query_as(
            "SELECT comment_id AS owner_id, id, user_id, created_at FROM comment_likes
             WHERE comment_id = ANY($1) ORDER BY created_at, seq",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;

        let mut likes = group_likes(like_rows, LikeTarget::Comment);
        rows.into_iter()
            .map(|row| {
                let row_likes = likes.remove(&row.id).unwrap_or_default();
                comment_record(row, row_likes)
            })
            .collect()
    }

    async fn write_post_children(&mut self, record: &PostRecord) -> Result<(), DomainError> {
        for like in &record.likes {
            sqlx::query(
                "INSERT INTO post_likes (id, post_id, user_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(like.id)
            .bind(record.id)
            .bind(&like.user_id)
            .bind(like.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        }
        for image in &record.images {
            sqlx::query("INSERT INTO post_images (id, post_id, path) VALUES ($1, $2, $3)")
                .bind(image.id)
                .bind(record.id)
                .bind(&image.path)
                .execute(&mut *self.tx)
                .await
                .map_err(DomainError::storage)?;
        }
        Ok(())
    }

    async fn write_comment_likes(&mut self, record: &CommentRecord) -> Result<(), DomainError> {
        for like in &record.likes {
            sqlx::query(
                "INSERT INTO comment_likes (id, comment_id, user_id, created_at)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(like.id)
            .bind(record.id)
            .bind(&like.user_id)
            .bind(like.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        }
        Ok(())
    }
}

#[async_trait]
impl TableGateway<PostRecord> for PgTransaction {
    async fn find(&mut self, id: Uuid) -> Result<Option<PostRecord>, DomainError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;

        match row {
            Some(row) => Ok(self.posts_with_children(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, record), fields(post_id = %record.id))]
    async fn insert(&mut self, record: &PostRecord) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO posts (id, title, content, author_id, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.author_id)
        .bind(record.version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;
        self.write_post_children(record).await
    }

    #[instrument(skip(self, record), fields(post_id = %record.id))]
    async fn update(&mut self, record: &PostRecord) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE posts SET title = $2, content = $3, version = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.content)
        .bind(record.version)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;

        for table in ["post_likes", "post_images"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE post_id = $1"))
                .bind(record.id)
                .execute(&mut *self.tx)
                .await
                .map_err(DomainError::storage)?;
        }
        self.write_post_children(record).await
    }

    #[instrument(skip(self))]
    async fn delete(&mut self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        Ok(())
    }

    async fn query(&mut self, filter: &PostFilter) -> Result<Vec<PostRecord>, DomainError> {
        let rows = self.post_rows(filter).await?;
        self.posts_with_children(rows).await
    }
}

#[async_trait]
impl TableGateway<CommentRecord> for PgTransaction {
    async fn find(&mut self, id: Uuid) -> Result<Option<CommentRecord>, DomainError> {
        let row: Option<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;

        match row {
            Some(row) => Ok(self.comments_with_likes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, record), fields(comment_id = %record.id))]
    async fn insert(&mut self, record: &CommentRecord) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO comments
             (id, post_id, parent_id, author_id, content, level, version, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(record.post_id)
        .bind(record.parent_id)
        .bind(&record.author_id)
        .bind(&record.content)
        .bind(i16::from(record.level))
        .bind(record.version)
        .bind(record.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DomainError::storage)?;
        self.write_comment_likes(record).await
    }

    #[instrument(skip(self, record), fields(comment_id = %record.id))]
    async fn update(&mut self, record: &CommentRecord) -> Result<(), DomainError> {
        sqlx::query("UPDATE comments SET content = $2, version = $3 WHERE id = $1")
            .bind(record.id)
            .bind(&record.content)
            .bind(record.version)
            .execute(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1")
            .bind(record.id)
            .execute(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        self.write_comment_likes(record).await
    }

    #[instrument(skip(self))]
    async fn delete(&mut self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        Ok(())
    }

    async fn query(&mut self, filter: &CommentFilter) -> Result<Vec<CommentRecord>, DomainError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(COMMENT_COLUMNS).push(" FROM comments WHERE TRUE");
        if let Some(post_id) = filter.post_id {
            query.push(" AND post_id = ").push_bind(post_id);
        }
        if let Some(parent_id) = filter.parent_id {
            query.push(" AND parent_id = ").push_bind(parent_id);
        }
        if let Some(author_id) = &filter.author_id {
            query.push(" AND author_id = ").push_bind(author_id.clone());
        }
        query.push(" ORDER BY created_at ASC, seq ASC");

        let rows = query
            .build_query_as::<CommentRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DomainError::storage)?;
        self.comments_with_likes(rows).await
    }
}

#[async_trait]
impl SocialTransaction for PgTransaction {
    fn posts(&mut self) -> &mut dyn TableGateway<PostRecord> {
        self
    }

    fn comments(&mut self) -> &mut dyn TableGateway<CommentRecord> {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(DomainError::storage)?;
        debug!("postgres transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.rollback().await.map_err(DomainError::storage)?;
        debug!("postgres transaction rolled back");
        Ok(())
    }
}
