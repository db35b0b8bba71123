use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::user::User;
use crate::infra::db::{self, Db};

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Seam for the external authentication collaborator (and the test
    /// harness): registers an identity this service can attach content to.
    pub async fn create(&self, username: &str) -> Result<User> {
        let created_at = OffsetDateTime::now_utc();
        let row = sqlx::query(
            "INSERT INTO users (username, created_at) VALUES ($1, $2) \
             RETURNING id, username, created_at",
        )
        .bind(username)
        .bind(db::encode_timestamp(created_at)?)
        .fetch_one(self.db.pool())
        .await?;

        user_from_row(&row)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        created_at: db::decode_timestamp(row.get("created_at"))?,
    })
}
