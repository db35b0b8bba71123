use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::post::Post;
use crate::infra::db::{self, Db};

/// Shared SELECT column list for posts; every post query joins the author
/// (required) and the group (optional) so callers get a fully shaped `Post`.
pub(crate) const POST_COLUMNS: &str =
    "p.id, p.text, p.pub_date, p.author_id, u.username AS author_username, \
     p.group_id, g.title AS group_title, g.slug AS group_slug, p.image";

pub(crate) const POST_JOINS: &str =
    "FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id";

/// Newest first; pub_date ties fall back to insertion order.
pub(crate) const POST_ORDER: &str = "ORDER BY p.pub_date DESC, p.id ASC";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// `pub_date` is assigned here, once; submitters never control it.
    pub async fn create(
        &self,
        author_id: i64,
        text: &str,
        group_id: Option<i64>,
        image: Option<&str>,
    ) -> Result<i64> {
        let pub_date = OffsetDateTime::now_utc();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (text, pub_date, author_id, group_id, image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(text)
        .bind(db::encode_timestamp(pub_date)?)
        .bind(author_id)
        .bind(group_id)
        .bind(image)
        .fetch_one(self.db.pool())
        .await?;

        Ok(id)
    }

    /// Updates the mutable fields in place. `pub_date` and `author_id` stay
    /// untouched; the image is only replaced when a new one was uploaded.
    pub async fn update(
        &self,
        post_id: i64,
        text: &str,
        group_id: Option<i64>,
        image: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts \
             SET text = $2, group_id = $3, image = COALESCE($4, image) \
             WHERE id = $1",
        )
        .bind(post_id)
        .bind(text)
        .bind(group_id)
        .bind(image)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} {} WHERE p.id = $1",
            POST_COLUMNS, POST_JOINS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(post_from_row).transpose()
    }

    pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} {} {} LIMIT $1 OFFSET $2",
            POST_COLUMNS, POST_JOINS, POST_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(post_from_row).collect()
    }

    pub async fn count_all(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn find_by_group(&self, group_id: i64, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} {} WHERE p.group_id = $1 {} LIMIT $2 OFFSET $3",
            POST_COLUMNS, POST_JOINS, POST_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(group_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(post_from_row).collect()
    }

    pub async fn count_by_group(&self, group_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn find_by_author(
        &self,
        author_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} {} WHERE p.author_id = $1 {} LIMIT $2 OFFSET $3",
            POST_COLUMNS, POST_JOINS, POST_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(author_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(post_from_row).collect()
    }

    pub async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}

pub(crate) fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        text: row.get("text"),
        pub_date: db::decode_timestamp(row.get("pub_date"))?,
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group_id: row.get("group_id"),
        group_title: row.get("group_title"),
        group_slug: row.get("group_slug"),
        image: row.get("image"),
    })
}
