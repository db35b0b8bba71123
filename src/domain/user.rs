use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identity entity. Rows are written by the external authentication
/// collaborator; this service only reads them and hangs posts, comments and
/// follow edges off them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
