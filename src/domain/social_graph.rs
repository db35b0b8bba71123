use serde::{Deserialize, Serialize};

/// Directed follow edge: `user_id` follows `author_id`. The pair is unique
/// and `user_id <> author_id` is enforced by the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub user_id: i64,
    pub author_id: i64,
}
