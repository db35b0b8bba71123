pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{cache::FeedCache, db::Db, storage::MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub feed_cache: FeedCache,
    pub media: MediaStore,
    pub posts_per_page: u32,
}
