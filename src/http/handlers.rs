use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::app::comments::CommentService;
use crate::app::feed::FeedService;
use crate::app::forms::{CommentForm, PostForm, UploadedImage};
use crate::app::groups::GroupService;
use crate::app::pagination::{Page, Pager};
use crate::app::posts::PostService;
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::post::Post;
use crate::domain::user::User;
use crate::http::{found, AppError, AuthUser, MaybeAuthUser};
use crate::AppState;

// ---------------------------------------------------------------------------
// View-context payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    pub author: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct GroupRef {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

#[derive(Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub username: String,
}

#[derive(Serialize)]
pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        let group = match (post.group_id, post.group_title, post.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupRef { id, title, slug }),
            _ => None,
        };
        Self {
            id: post.id,
            text: post.text,
            pub_date: post.pub_date,
            author: post.author_username,
            group,
            image: post.image,
        }
    }
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            author: comment.author_username,
            text: comment.text,
            created: comment.created,
        }
    }
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?page=<n>`: missing or unparsable values mean the first page; values past
/// the end are clamped later by the pager.
fn requested_page(query: &PageQuery) -> u32 {
    query
        .page
        .as_deref()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

fn store_error(err: anyhow::Error, what: &'static str) -> AppError {
    tracing::error!(error = ?err, "{}", what);
    AppError::internal(what)
}

fn post_views(page: Page<Post>) -> Page<PostView> {
    page.map(PostView::from)
}

fn detail_path(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

fn profile_path(username: &str) -> String {
    format!("/profile/{}/", username)
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let feed = FeedService::new(state.db.clone(), state.feed_cache.clone());
    let page = feed
        .index_page(requested_page(&query), state.posts_per_page)
        .await
        .map_err(|err| store_error(err, "failed to load the global feed"))?;

    Ok(Json(json!({ "page": post_views(page) })).into_response())
}

pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let group = GroupService::new(state.db.clone())
        .find_by_slug(&slug)
        .await
        .map_err(|err| store_error(err, "failed to load group"))?
        .ok_or_else(|| AppError::not_found("group not found"))?;

    let posts = PostService::new(state.db.clone());
    let total = posts
        .count_by_group(group.id)
        .await
        .map_err(|err| store_error(err, "failed to count group posts"))?;
    let bounds = Pager::new(state.posts_per_page).locate(total, requested_page(&query));
    let items = posts
        .find_by_group(group.id, bounds.limit, bounds.offset)
        .await
        .map_err(|err| store_error(err, "failed to load group posts"))?;
    let page = Page::assemble(items, bounds, total, state.posts_per_page);

    Ok(Json(json!({
        "group": group,
        "page": post_views(page),
    }))
    .into_response())
}

pub async fn follow_index(
    State(state): State<AppState>,
    viewer: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let feed = FeedService::new(state.db.clone(), state.feed_cache.clone());
    let page = feed
        .follow_page(viewer.user.id, requested_page(&query), state.posts_per_page)
        .await
        .map_err(|err| store_error(err, "failed to load the follow feed"))?;

    Ok(Json(json!({ "page": post_views(page) })).into_response())
}

// ---------------------------------------------------------------------------
// Profiles and the follow graph
// ---------------------------------------------------------------------------

pub async fn profile(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let author = UserService::new(state.db.clone())
        .find_by_username(&username)
        .await
        .map_err(|err| store_error(err, "failed to load profile"))?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let posts = PostService::new(state.db.clone());
    let total = posts
        .count_by_author(author.id)
        .await
        .map_err(|err| store_error(err, "failed to count profile posts"))?;
    let bounds = Pager::new(state.posts_per_page).locate(total, requested_page(&query));
    let items = posts
        .find_by_author(author.id, bounds.limit, bounds.offset)
        .await
        .map_err(|err| store_error(err, "failed to load profile posts"))?;
    let page = Page::assemble(items, bounds, total, state.posts_per_page);

    // Only meaningful for an authenticated viewer looking at someone else.
    let following = match &viewer.0 {
        Some(user) if user.id != author.id => SocialService::new(state.db.clone())
            .is_following(user.id, author.id)
            .await
            .map_err(|err| store_error(err, "failed to load follow state"))?,
        _ => false,
    };

    Ok(Json(json!({
        "author": AuthorView::from(&author),
        "post_count": total,
        "following": following,
        "page": post_views(page),
    }))
    .into_response())
}

pub async fn profile_follow(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let author = UserService::new(state.db.clone())
        .find_by_username(&username)
        .await
        .map_err(|err| store_error(err, "failed to load profile"))?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    // Self-follow is silently skipped, as is an already-present edge.
    if viewer.user.id != author.id {
        SocialService::new(state.db.clone())
            .follow(viewer.user.id, author.id)
            .await
            .map_err(|err| store_error(err, "failed to follow"))?;
    }

    Ok(found(profile_path(&author.username)))
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let author = UserService::new(state.db.clone())
        .find_by_username(&username)
        .await
        .map_err(|err| store_error(err, "failed to load profile"))?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    // A missing edge is not an error; the redirect happens either way.
    if viewer.user.id != author.id {
        SocialService::new(state.db.clone())
            .unfollow(viewer.user.id, author.id)
            .await
            .map_err(|err| store_error(err, "failed to unfollow"))?;
    }

    Ok(found(profile_path(&author.username)))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts
        .find_by_id(post_id)
        .await
        .map_err(|err| store_error(err, "failed to load post"))?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    let post_count = posts
        .count_by_author(post.author_id)
        .await
        .map_err(|err| store_error(err, "failed to count author posts"))?;

    let comments = CommentService::new(state.db.clone())
        .list_for_post(post.id)
        .await
        .map_err(|err| store_error(err, "failed to load comments"))?;

    Ok(Json(json!({
        "post": PostView::from(post),
        "post_count": post_count,
        "comments": comments.into_iter().map(CommentView::from).collect::<Vec<_>>(),
    }))
    .into_response())
}

pub async fn post_create_form(
    State(state): State<AppState>,
    _viewer: AuthUser,
) -> Result<Response, AppError> {
    let groups = GroupService::new(state.db.clone())
        .list_all()
        .await
        .map_err(|err| store_error(err, "failed to load groups"))?;

    Ok(Json(json!({
        "form": { "text": "", "group": Option::<i64>::None },
        "groups": groups,
    }))
    .into_response())
}

pub async fn post_create(
    State(state): State<AppState>,
    viewer: AuthUser,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let form = PostForm::read(&mut multipart)
        .await
        .map_err(|err| AppError::bad_request(err.0))?;

    let groups = GroupService::new(state.db.clone())
        .list_all()
        .await
        .map_err(|err| store_error(err, "failed to load groups"))?;

    let draft = match form.validate(&groups) {
        Ok(draft) => draft,
        Err(errors) => {
            // Re-render the form with every failure; nothing was persisted.
            return Ok(invalid_form_response(&form, &groups, &errors, None));
        }
    };

    let image_key = store_image(&state, draft.image.as_ref()).await?;
    let created = PostService::new(state.db.clone())
        .create(
            viewer.user.id,
            &draft.text,
            draft.group_id,
            image_key.as_deref(),
        )
        .await;
    if let Err(err) = created {
        // No row references the file, so don't leave it behind.
        discard_image(&state, image_key.as_deref()).await;
        return Err(store_error(err, "failed to create post"));
    }
    state.feed_cache.clear();

    Ok(found(profile_path(&viewer.user.username)))
}

pub async fn post_edit_form(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let post = PostService::new(state.db.clone())
        .find_by_id(post_id)
        .await
        .map_err(|err| store_error(err, "failed to load post"))?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    // Non-authors are sent to the read view instead of getting an error.
    if viewer.user.id != post.author_id {
        return Ok(found(detail_path(post.id)));
    }

    let groups = GroupService::new(state.db.clone())
        .list_all()
        .await
        .map_err(|err| store_error(err, "failed to load groups"))?;

    Ok(Json(json!({
        "form": { "text": post.text, "group": post.group_id },
        "groups": groups,
        "is_edit": true,
        "post_id": post.id,
    }))
    .into_response())
}

pub async fn post_edit(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(post_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts
        .find_by_id(post_id)
        .await
        .map_err(|err| store_error(err, "failed to load post"))?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    if viewer.user.id != post.author_id {
        return Ok(found(detail_path(post.id)));
    }

    let form = PostForm::read(&mut multipart)
        .await
        .map_err(|err| AppError::bad_request(err.0))?;

    let groups = GroupService::new(state.db.clone())
        .list_all()
        .await
        .map_err(|err| store_error(err, "failed to load groups"))?;

    let draft = match form.validate(&groups) {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(invalid_form_response(&form, &groups, &errors, Some(post.id)));
        }
    };

    // The image is only replaced when a new upload came in.
    let image_key = store_image(&state, draft.image.as_ref()).await?;
    let updated = posts
        .update(post.id, &draft.text, draft.group_id, image_key.as_deref())
        .await;
    if let Err(err) = updated {
        discard_image(&state, image_key.as_deref()).await;
        return Err(store_error(err, "failed to update post"));
    }
    state.feed_cache.clear();

    Ok(found(detail_path(post.id)))
}

pub async fn add_comment(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let post = PostService::new(state.db.clone())
        .find_by_id(post_id)
        .await
        .map_err(|err| store_error(err, "failed to load post"))?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    // Invalid comment submissions persist nothing; either way the caller
    // lands back on the detail view.
    if let Ok(text) = form.validate() {
        CommentService::new(state.db.clone())
            .create(post.id, viewer.user.id, &text)
            .await
            .map_err(|err| store_error(err, "failed to add comment"))?;
    }

    Ok(found(detail_path(post.id)))
}

// ---------------------------------------------------------------------------
// Shared bits
// ---------------------------------------------------------------------------

async fn store_image(
    state: &AppState,
    upload: Option<&UploadedImage>,
) -> Result<Option<String>, AppError> {
    match upload {
        Some(image) => {
            let key = state
                .media
                .store_post_image(&image.file_name, &image.data)
                .await
                .map_err(|err| store_error(err, "failed to store image"))?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}

/// Best-effort cleanup of a file whose post write failed.
async fn discard_image(state: &AppState, key: Option<&str>) {
    if let Some(key) = key {
        if let Err(err) = state.media.remove(key).await {
            tracing::warn!(error = ?err, key, "failed to remove orphaned image");
        }
    }
}

fn invalid_form_response(
    form: &PostForm,
    groups: &[Group],
    errors: &crate::app::forms::FormErrors,
    edited_post_id: Option<i64>,
) -> Response {
    let mut body = json!({
        "form": { "text": form.text, "group": form.group },
        "groups": groups,
        "errors": errors,
    });
    if let Some(post_id) = edited_post_id {
        body["is_edit"] = json!(true);
        body["post_id"] = json!(post_id);
    }
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn page_not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "page not found", "path": uri.path() })),
    )
        .into_response()
}
