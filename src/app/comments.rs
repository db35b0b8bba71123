use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::comment::Comment;
use crate::infra::db::{self, Db};

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let created = OffsetDateTime::now_utc();
        let row = sqlx::query(
            "INSERT INTO comments (post_id, author_id, text, created) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, post_id, author_id, text, created",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(db::encode_timestamp(created)?)
        .fetch_one(self.db.pool())
        .await?;

        let username: String =
            sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
                .bind(author_id)
                .fetch_one(self.db.pool())
                .await?;

        Ok(Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            author_username: username,
            text: row.get("text"),
            created: db::decode_timestamp(row.get("created"))?,
        })
    }

    /// Oldest first, the order they were written in.
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
                    c.text, c.created \
             FROM comments c \
             JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Comment {
                    id: row.get("id"),
                    post_id: row.get("post_id"),
                    author_id: row.get("author_id"),
                    author_username: row.get("author_username"),
                    text: row.get("text"),
                    created: db::decode_timestamp(row.get("created"))?,
                })
            })
            .collect()
    }
}
