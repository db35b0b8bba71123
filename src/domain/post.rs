use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A published post, joined with its author's username and (when set) the
/// group it belongs to. `pub_date` is assigned once at creation and never
/// updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub image: Option<String>,
}
