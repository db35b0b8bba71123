use serde::{Deserialize, Serialize};

/// Topical category a post may optionally belong to. Deleting a group nulls
/// out `group_id` on its posts, it never deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}
