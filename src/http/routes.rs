use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn feeds() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/group/:slug", get(handlers::group_posts))
        .route("/follow", get(handlers::follow_index))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/create",
            get(handlers::post_create_form).post(handlers::post_create),
        )
        .route("/posts/:id", get(handlers::post_detail))
        .route(
            "/posts/:id/edit",
            get(handlers::post_edit_form).post(handlers::post_edit),
        )
        .route("/posts/:id/comment", post(handlers::add_comment))
}

pub fn profiles() -> Router<AppState> {
    Router::new()
        .route("/profile/:username", get(handlers::profile))
        // GET for these two mutations is part of the published contract;
        // see DESIGN.md before changing the method.
        .route("/profile/:username/follow", get(handlers::profile_follow))
        .route(
            "/profile/:username/unfollow",
            get(handlers::profile_unfollow),
        )
}
