#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tower::{Layer, ServiceExt};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use samizdat::app::groups::GroupService;
use samizdat::app::posts::PostService;
use samizdat::app::users::UserService;
use samizdat::config::AppConfig;
use samizdat::domain::{group::Group, user::User};
use samizdat::infra::{cache::FeedCache, db::Db, storage::MediaStore};
use samizdat::AppState;

pub const BOUNDARY: &str = "----samizdat-test-boundary";

/// Minimal valid 1x1 PNG, enough for format sniffing and disk round-trips.
pub const PNG_1PX: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Each test gets its own app over a private SQLite file and media directory,
/// so tests stay independent and never race on shared state. The directory is
/// deleted when the `TestApp` drops.
pub struct TestApp {
    app: NormalizePath<Router>,
    pub state: AppState,
    pub media_root: PathBuf,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn location(&self) -> String {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let tmp = TempDir::with_prefix("samizdat-test-").expect("failed to create test dir");
        let dir = tmp.path().to_path_buf();
        let media_root = dir.join("media");

        let config = AppConfig {
            http_addr: "127.0.0.1:0".to_string(),
            database_url: format!("sqlite://{}?mode=rwc", dir.join("test.db").display()),
            media_root: media_root.display().to_string(),
            posts_per_page: 10,
            feed_cache_ttl_seconds: 60,
            upload_max_bytes: 10 * 1024 * 1024,
            db_max_connections: 5,
            db_connect_timeout_seconds: 5,
        };

        let db = Db::connect(&config).await.expect("Db::connect failed");
        db.migrate().await.expect("migrate failed");

        let state = AppState {
            db,
            feed_cache: FeedCache::new(Duration::from_secs(config.feed_cache_ttl_seconds)),
            media: MediaStore::new(&config.media_root).expect("MediaStore::new failed"),
            posts_per_page: config.posts_per_page,
        };

        let router = samizdat::http::router(state.clone());
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);

        TestApp {
            app,
            state,
            media_root,
            _dir: tmp,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Body,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = builder.body(body).expect("failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers; `user` is the username asserted by the
    // external auth collaborator via the x-auth-user header.
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, user: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        if let Some(username) = user {
            headers.push(("x-auth-user", username));
        }
        self.request(Method::GET, path, Body::empty(), &headers).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        user: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![(
            "content-type",
            "application/x-www-form-urlencoded",
        )];
        if let Some(username) = user {
            headers.push(("x-auth-user", username));
        }
        self.request(Method::POST, path, Body::from(form_body(fields)), &headers)
            .await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
        user: Option<&str>,
    ) -> TestResponse {
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        let mut headers = vec![("content-type", content_type.as_str())];
        if let Some(username) = user {
            headers.push(("x-auth-user", username));
        }
        self.request(
            Method::POST,
            path,
            Body::from(multipart_body(fields, file)),
            &headers,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------
    pub async fn create_user(&self, username: &str) -> User {
        UserService::new(self.state.db.clone())
            .create(username)
            .await
            .expect("create test user failed")
    }

    pub async fn create_group(&self, title: &str, slug: &str) -> Group {
        GroupService::new(self.state.db.clone())
            .create(title, slug, "")
            .await
            .expect("create test group failed")
    }

    pub async fn create_post(&self, author_id: i64, text: &str, group_id: Option<i64>) -> i64 {
        PostService::new(self.state.db.clone())
            .create(author_id, text, group_id, None)
            .await
            .expect("create test post failed")
    }

    /// Inserts a post with an explicit pub_date (unix nanoseconds), for
    /// ordering assertions.
    pub async fn insert_post_at(&self, author_id: i64, text: &str, pub_date_nanos: i64) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO posts (text, pub_date, author_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(text)
        .bind(pub_date_nanos)
        .bind(author_id)
        .fetch_one(self.state.db.pool())
        .await
        .expect("insert test post failed")
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(self.state.db.pool())
            .await
            .expect("count query failed")
    }

    pub async fn follow_edge_count(&self, user_id: i64, author_id: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE user_id = $1 AND author_id = $2",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.state.db.pool())
        .await
        .expect("count query failed")
    }
}

// ---------------------------------------------------------------------------
// Body builders
// ---------------------------------------------------------------------------

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
