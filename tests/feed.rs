//! Feed and pagination tests: global feed ordering, group feeds, the
//! personalized follow feed, and the response cache lifecycle.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use samizdat::app::social::SocialService;

#[tokio::test]
async fn global_feed_is_newest_first_with_insertion_order_ties() {
    let app = TestApp::spawn().await;
    let user = app.create_user("feed_order").await;

    let oldest = app.insert_post_at(user.id, "oldest", 100).await;
    let tied_first = app.insert_post_at(user.id, "tied first", 300).await;
    let middle = app.insert_post_at(user.id, "middle", 200).await;
    let tied_second = app.insert_post_at(user.id, "tied second", 300).await;

    let resp = app.get("/", None).await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = resp.json();
    let ids: Vec<i64> = body["page"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();

    assert_eq!(ids, vec![tied_first, tied_second, middle, oldest]);
}

#[tokio::test]
async fn global_feed_pagination_clamps_out_of_range_pages() {
    let app = TestApp::spawn().await;
    let user = app.create_user("feed_pages").await;
    for i in 0..15 {
        app.create_post(user.id, &format!("post {}", i), None).await;
    }

    let resp = app.get("/?page=1", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["page"]["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["page"]["number"], 1);
    assert_eq!(body["page"]["num_pages"], 2);
    assert_eq!(body["page"]["total"], 15);
    assert_eq!(body["page"]["has_next"], true);
    assert_eq!(body["page"]["has_previous"], false);

    let resp = app.get("/?page=2", None).await;
    let body = resp.json();
    assert_eq!(body["page"]["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["page"]["has_next"], false);
    assert_eq!(body["page"]["has_previous"], true);

    // Past the end: clamped to the last page, never an error.
    let resp = app.get("/?page=3", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["page"]["number"], 2);
    assert_eq!(body["page"]["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn unparsable_page_parameter_means_first_page() {
    let app = TestApp::spawn().await;
    let user = app.create_user("feed_badpage").await;
    app.create_post(user.id, "only post", None).await;

    let resp = app.get("/?page=abc", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["page"]["number"], 1);
}

#[tokio::test]
async fn group_feed_contains_exactly_its_posts() {
    let app = TestApp::spawn().await;
    let user = app.create_user("feed_groups").await;
    let cats = app.create_group("Cats", "cats").await;
    let dogs = app.create_group("Dogs", "dogs").await;

    let cat_post = app.create_post(user.id, "meow", Some(cats.id)).await;
    app.create_post(user.id, "woof", Some(dogs.id)).await;
    app.create_post(user.id, "no group", None).await;

    let resp = app.get("/group/cats/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["group"]["slug"], "cats");
    let items = body["page"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_i64().unwrap(), cat_post);
    assert_eq!(items[0]["group"]["slug"], "cats");

    let resp = app.get("/group/dogs/", None).await;
    let items = resp.json()["page"]["items"].as_array().unwrap().clone();
    assert!(items.iter().all(|item| item["id"].as_i64() != Some(cat_post)));
}

#[tokio::test]
async fn unknown_group_slug_is_404() {
    let app = TestApp::spawn().await;
    let resp = app.get("/group/missing/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "group not found");
}

#[tokio::test]
async fn follow_feed_requires_auth() {
    let app = TestApp::spawn().await;
    let resp = app.get("/follow/", None).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(resp.location().starts_with("/auth/login/"));
}

#[tokio::test]
async fn follow_feed_matches_followed_authors_posts() {
    let app = TestApp::spawn().await;
    let author = app.create_user("auth").await;
    let follower = app.create_user("auth1").await;
    let unrelated = app.create_user("auth2").await;

    let resp = app.get("/profile/auth/follow/", Some(&follower.username)).await;
    assert_eq!(resp.status, StatusCode::FOUND);

    app.create_post(author.id, "пост для ленты", None).await;
    app.create_post(author.id, "второй пост", None).await;

    let author_posts = app.count("SELECT COUNT(*) FROM posts").await;
    assert_eq!(author_posts, 2);

    let resp = app.get("/follow/", Some(&follower.username)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["page"]["total"].as_i64().unwrap(), author_posts);

    let resp = app.get("/follow/", Some(&unrelated.username)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["page"]["total"].as_i64().unwrap(), 0);

    let followed = SocialService::new(app.state.db.clone())
        .followed_author_ids(follower.id)
        .await
        .unwrap();
    assert_eq!(followed, vec![author.id]);
}

#[tokio::test]
async fn index_cache_is_cleared_when_a_post_is_created() {
    let app = TestApp::spawn().await;
    let user = app.create_user("feed_cache").await;

    // Prime the cache with an empty feed; the TTL is long enough that only
    // wholesale invalidation can refresh it within this test.
    let resp = app.get("/", None).await;
    assert_eq!(resp.json()["page"]["total"], 0);

    let resp = app
        .post_multipart(
            "/create/",
            &[("text", "cache buster")],
            None,
            Some(&user.username),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);

    let resp = app.get("/", None).await;
    assert_eq!(resp.json()["page"]["total"], 1);
}

#[tokio::test]
async fn out_of_range_pages_share_one_cache_entry() {
    let app = TestApp::spawn().await;
    let user = app.create_user("feed_cachekeys").await;
    app.create_post(user.id, "single", None).await;

    // Every request clamps to the one existing page, so arbitrary page
    // numbers must not mint new cache entries.
    for page in ["1", "7", "9999", "123456789"] {
        let resp = app.get(&format!("/?page={}", page), None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json()["page"]["number"], 1);
    }

    assert_eq!(app.state.feed_cache.len(), 1);
}

#[tokio::test]
async fn profile_reports_post_count_and_following_indicator() {
    let app = TestApp::spawn().await;
    let author = app.create_user("profile_author").await;
    let viewer = app.create_user("profile_viewer").await;
    app.create_post(author.id, "first", None).await;
    app.create_post(author.id, "second", None).await;

    app.get("/profile/profile_author/follow/", Some(&viewer.username))
        .await;

    let resp = app
        .get("/profile/profile_author/", Some(&viewer.username))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["author"]["username"], "profile_author");
    assert_eq!(body["post_count"], 2);
    assert_eq!(body["following"], true);
    assert_eq!(body["page"]["items"].as_array().unwrap().len(), 2);

    // Looking at your own profile never reports "following".
    let resp = app
        .get("/profile/profile_author/", Some(&author.username))
        .await;
    assert_eq!(resp.json()["following"], false);

    // Anonymous viewers get the profile too, without the indicator.
    let resp = app.get("/profile/profile_author/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["following"], false);
}

#[tokio::test]
async fn unknown_profile_is_404() {
    let app = TestApp::spawn().await;
    let resp = app.get("/profile/nobody/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "user not found");
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = TestApp::spawn().await;
    let resp = app.get("/definitely/not/here/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "page not found");
}
