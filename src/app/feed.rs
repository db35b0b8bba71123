use anyhow::Result;
use tracing::warn;

use crate::app::pagination::{Page, Pager};
use crate::app::posts::{post_from_row, POST_COLUMNS, POST_JOINS, POST_ORDER};
use crate::domain::post::Post;
use crate::infra::{cache::FeedCache, db::Db};

#[derive(Clone)]
pub struct FeedService {
    db: Db,
    cache: FeedCache,
}

impl FeedService {
    pub fn new(db: Db, cache: FeedCache) -> Self {
        Self { db, cache }
    }

    /// The global feed: every post, newest first. Pages are served out of the
    /// response cache when fresh; post writes clear the cache wholesale, the
    /// TTL is only a fallback.
    pub async fn index_page(&self, requested: u32, per_page: u32) -> Result<Page<Post>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        let bounds = Pager::new(per_page).locate(total, requested);

        // Keyed by the clamped page number, so the key space is bounded by
        // the page count no matter what `?page=` values come in.
        let cache_key = format!("index:{}", bounds.number);
        if let Some(body) = self.cache.get(&cache_key) {
            match serde_json::from_str::<Page<Post>>(&body) {
                Ok(page) => return Ok(page),
                Err(err) => warn!(error = %err, "discarding unreadable feed cache entry"),
            }
        }

        let sql = format!(
            "SELECT {} {} {} LIMIT $1 OFFSET $2",
            POST_COLUMNS, POST_JOINS, POST_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(bounds.limit)
            .bind(bounds.offset)
            .fetch_all(self.db.pool())
            .await?;
        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        let page = Page::assemble(posts, bounds, total, per_page);

        match serde_json::to_string(&page) {
            Ok(body) => self.cache.put(cache_key, body),
            Err(err) => warn!(error = %err, "failed to serialize feed cache entry"),
        }

        Ok(page)
    }

    /// The personalized follow feed: posts whose author the viewer follows,
    /// newest first. Not cached.
    pub async fn follow_page(
        &self,
        viewer_id: i64,
        requested: u32,
        per_page: u32,
    ) -> Result<Page<Post>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts \
             WHERE author_id IN (SELECT author_id FROM follows WHERE user_id = $1)",
        )
        .bind(viewer_id)
        .fetch_one(self.db.pool())
        .await?;
        let bounds = Pager::new(per_page).locate(total, requested);

        let sql = format!(
            "SELECT {} {} \
             WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1) \
             {} LIMIT $2 OFFSET $3",
            POST_COLUMNS, POST_JOINS, POST_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(bounds.limit)
            .bind(bounds.offset)
            .fetch_all(self.db.pool())
            .await?;
        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::assemble(posts, bounds, total, per_page))
    }
}
