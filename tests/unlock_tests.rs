//! Key redemption through the public unlock endpoint.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use keymark::config::Config;
use keymark::db::Document;
use keymark::domain::{Article, KeyRecord, KeyStatus};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const KEY: &str = "KMTESTKEY01";

struct Fixture {
    state: Arc<keymark::api::AppState>,
    router: Router,
    root: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Two key-gated articles with bodies, plus one unused 24h key.
async fn fixture() -> Fixture {
    let root = std::env::temp_dir().join(format!("keymark-unlock-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.data_dir = root.join("data").to_string_lossy().into_owned();
    config.general.images_path = root.join("images").to_string_lossy().into_owned();

    let state = keymark::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");

    let now = Utc::now();
    let articles = vec![
        Article::new("post-a".into(), "A".into(), String::new(), now),
        Article::new("post-b".into(), "B".into(), String::new(), now),
    ];
    state
        .store()
        .save(Document::Articles, &articles)
        .await
        .unwrap();
    for article in &articles {
        state
            .shared
            .content
            .write_article(&article.id, &format!("# Inside {}", article.title))
            .await
            .unwrap();
    }
    state
        .store()
        .save(Document::Keys, &vec![KeyRecord::new(KEY, 24, now)])
        .await
        .unwrap();

    let router = keymark::api::router(state.clone());
    Fixture {
        state,
        router,
        root,
    }
}

async fn unlock(fx: &Fixture, payload: Value) -> Response {
    fx.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/unlock")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn stored_key(fx: &Fixture) -> KeyRecord {
    let keys: Vec<KeyRecord> = fx.state.store().load(Document::Keys).await;
    keys.into_iter().find(|k| k.code == KEY).unwrap()
}

#[tokio::test]
async fn test_unlock_activates_key_and_sets_cookie() {
    let fx = fixture().await;

    let response = unlock(
        &fx,
        json!({"article_id": "post-a", "key": KEY, "fingerprint": "device-1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("unlocked_post-a=true"))
        .expect("unlock cookie")
        .to_string();
    assert!(cookie.contains("Path=/"));

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(
        body["content"]
            .as_str()
            .unwrap()
            .contains("<h1>Inside A</h1>")
    );

    let key = stored_key(&fx).await;
    assert_eq!(key.status, KeyStatus::Active);
    assert_eq!(key.bound_article_id.as_deref(), Some("post-a"));
    assert_eq!(key.fingerprints, vec!["device-1".to_string()]);
    let expire = key.expire_time.unwrap();
    let activated = key.activate_time.unwrap();
    assert_eq!(expire - activated, Duration::hours(24));

    // The cookie alone now opens the article.
    let response = fx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/articles/post-a")
                .header(header::COOKIE, "unlocked_post-a=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["locked"], false);
}

#[tokio::test]
async fn test_bound_key_rejects_other_article() {
    let fx = fixture().await;

    let body = json_body(unlock(&fx, json!({"article_id": "post-a", "key": KEY})).await).await;
    assert_eq!(body["success"], true);

    let body = json_body(unlock(&fx, json!({"article_id": "post-b", "key": KEY})).await).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "此卡密已绑定其他文章，请使用新卡密");
    assert!(body.get("content").is_none());
}

#[tokio::test]
async fn test_device_cap_allows_known_devices() {
    let fx = fixture().await;

    for device in ["d1", "d2", "d1"] {
        let body = json_body(
            unlock(
                &fx,
                json!({"article_id": "post-a", "key": KEY, "fingerprint": device}),
            )
            .await,
        )
        .await;
        assert_eq!(body["success"], true, "device {device}");
    }

    let body = json_body(
        unlock(
            &fx,
            json!({"article_id": "post-a", "key": KEY, "fingerprint": "d3"}),
        )
        .await,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "此卡密已绑定其他设备，请使用新卡密");

    let key = stored_key(&fx).await;
    assert_eq!(key.fingerprints, vec!["d1".to_string(), "d2".to_string()]);
}

#[tokio::test]
async fn test_expired_key_is_marked() {
    let fx = fixture().await;
    let past = Utc::now() - Duration::hours(2);

    let mut key = KeyRecord::new(KEY, 1, past);
    key.activate("post-a", None, past);
    fx.state
        .store()
        .save(Document::Keys, &vec![key])
        .await
        .unwrap();

    let body = json_body(unlock(&fx, json!({"article_id": "post-a", "key": KEY})).await).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "卡密已过期");

    assert_eq!(stored_key(&fx).await.status, KeyStatus::Expired);
}

#[tokio::test]
async fn test_unknown_key_and_article() {
    let fx = fixture().await;

    let body = json_body(unlock(&fx, json!({"article_id": "post-a", "key": "KMNOPE"})).await).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "无效的卡密");

    let body = json_body(unlock(&fx, json!({"article_id": "post-a", "key": "  "})).await).await;
    assert_eq!(body["message"], "无效的卡密");

    let body = json_body(unlock(&fx, json!({"article_id": "post-zz", "key": KEY})).await).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "文章不存在");

    assert_eq!(stored_key(&fx).await.status, KeyStatus::Unused);
}
