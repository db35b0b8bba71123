use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub media_root: String,
    pub posts_per_page: u32,
    pub feed_cache_ttl_seconds: u64,
    pub upload_max_bytes: usize,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let posts_per_page: u32 = env_or_parse("POSTS_PER_PAGE", "10")?;
        if posts_per_page == 0 {
            return Err(anyhow!("POSTS_PER_PAGE must be at least 1"));
        }

        Ok(Self {
            http_addr,
            database_url: env_or("DATABASE_URL", "sqlite://samizdat.db?mode=rwc"),
            media_root: env_or("MEDIA_ROOT", "media"),
            posts_per_page,
            feed_cache_ttl_seconds: env_or_parse("FEED_CACHE_TTL_SECONDS", "20")?,
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "10485760")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "5")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
