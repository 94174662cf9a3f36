//! Smoke tests for the public reader flows.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use keymark::config::Config;
use keymark::db::Document;
use keymark::domain::Article;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<keymark::api::AppState>, Router, PathBuf) {
    let root = std::env::temp_dir().join(format!("keymark-smoke-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.data_dir = root.join("data").to_string_lossy().into_owned();
    config.general.images_path = root.join("images").to_string_lossy().into_owned();
    config.general.guide_path = root.join("GUIDE.md").to_string_lossy().into_owned();

    let state = keymark::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");

    let router = keymark::api::router(state.clone());
    (state, router, root)
}

fn article(n: u32, views: u64) -> Article {
    let date = Utc.with_ymd_and_hms(2025, 1, n.min(28), 0, 0, 0).unwrap();
    let mut article = Article::new(
        format!("post-{n:03}"),
        format!("Article {n}"),
        "summary".to_string(),
        date,
    );
    article.views = views;
    article
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn smoke_public_listing_paginates_and_ranks() {
    let (state, router, root) = spawn_app().await;

    let mut articles: Vec<Article> = (1..=23).map(|n| article(n, u64::from(n))).collect();
    articles[4].hidden = true;
    state
        .store()
        .save(Document::Articles, &articles)
        .await
        .unwrap();

    let (status, body) = get_json(&router, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["total"], 22);
    assert_eq!(data["total_pages"], 3);
    assert_eq!(data["items"].as_array().unwrap().len(), 10);

    let hot = data["hot"].as_array().unwrap();
    assert_eq!(hot.len(), 10);
    assert_eq!(hot[0]["id"], "post-023");
    assert!(hot.iter().all(|a| a["id"] != "post-005"));

    // Out-of-range pages clamp to the last one.
    let (_, body) = get_json(&router, "/api/articles?page=9&limit=10").await;
    assert_eq!(body["data"]["page"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    // Limits below the public minimum are raised.
    let (_, body) = get_json(&router, "/api/articles?limit=1").await;
    assert_eq!(body["data"]["limit"], 5);

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn smoke_reading_free_article() {
    let (state, router, root) = spawn_app().await;

    let mut free = article(1, 0);
    free.requires_key = false;
    let paid = article(2, 0);
    state
        .store()
        .save(Document::Articles, &vec![free, paid])
        .await
        .unwrap();
    state
        .shared
        .content
        .write_article("post-001", "Plain **text**")
        .await
        .unwrap();

    let (status, body) = get_json(&router, "/api/articles/post-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["locked"], false);
    assert_eq!(body["data"]["views"], 1);
    assert!(
        body["data"]["content"]
            .as_str()
            .unwrap()
            .contains("<strong>text</strong>")
    );

    let (_, body) = get_json(&router, "/api/articles/post-002").await;
    assert_eq!(body["data"]["locked"], true);
    assert!(body["data"]["content"].is_null());

    let (status, _) = get_json(&router, "/api/articles/post-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn smoke_missing_body_renders_placeholder() {
    let (state, router, root) = spawn_app().await;

    let mut free = article(1, 0);
    free.requires_key = false;
    state
        .store()
        .save(Document::Articles, &vec![free])
        .await
        .unwrap();

    let (status, body) = get_json(&router, "/api/articles/post-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "<p>内容读取失败</p>");

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn smoke_site_and_pages() {
    let (_, router, root) = spawn_app().await;

    let (status, body) = get_json(&router, "/api/site").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enable_key_verification"], true);
    assert!(body["data"].get("admin_password").is_none());
    assert!(body["data"].get("two_fa_secret").is_none());

    let (status, body) = get_json(&router, "/api/pages/privacy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "隐私政策");
    assert!(body["data"]["html"].as_str().unwrap().contains("隐私政策"));

    let (status, body) = get_json(&router, "/api/pages/about").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["html"], "");

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn smoke_health_metrics_and_headers() {
    let (_, router, root) = spawn_app().await;

    let (status, body) = get_json(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-frame-options").unwrap(),
        "DENY"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Metrics not enabled or failed to initialize");

    let _ = std::fs::remove_dir_all(root);
}
