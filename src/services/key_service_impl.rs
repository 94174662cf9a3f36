//! JSON-document implementation of the `KeyService` trait.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::{ContentStore, Document, Outcome, Store};
use crate::domain::{Article, KeyRecord, Settings, UNLIMITED_DURATION, generate_key_code};
use crate::keys::{self, Grant, RedeemError, check_deletable, orphaned_codes, redeem};
use crate::listing::{KeySort, Page, PageBounds, PageRequest, paginate, sort_keys};
use crate::services::key_service::{
    KeyError, KeyService, KeyView, MAX_DURATION_HOURS, MAX_KEYS_PER_BATCH, UnlockRequest,
};
use crate::services::markdown::render_markdown;

pub struct JsonKeyService {
    store: Store,
    content: ContentStore,
    bounds: PageBounds,
}

impl JsonKeyService {
    #[must_use]
    pub const fn new(store: Store, content: ContentStore, bounds: PageBounds) -> Self {
        Self {
            store,
            content,
            bounds,
        }
    }

    async fn articles(&self) -> Vec<Article> {
        self.store.load(Document::Articles).await
    }
}

fn record_redemption(
    verdict: Result<Grant, RedeemError>,
    code: &str,
    article_id: &str,
    max_devices: usize,
) {
    let outcome = match verdict {
        Ok(grant) => grant.kind(),
        Err(err) => err.kind(),
    };
    metrics::counter!("key_redemptions_total", "outcome" => outcome).increment(1);

    match verdict {
        Ok(Grant::Activated) => info!(code, article_id, "Key activated"),
        Ok(Grant::DeviceBound) => info!(code, article_id, "Key bound to a new device"),
        Ok(Grant::Verified) => debug!(code, article_id, "Key verified"),
        Err(RedeemError::DeviceLimitExceeded) => {
            warn!(code, article_id, max_devices, "Device limit reached for key");
        }
        Err(RedeemError::KeyExpired) => info!(code, article_id, "Key expired"),
        Err(err) => info!(code, article_id, reason = err.kind(), "Key redemption refused"),
    }
}

#[async_trait]
impl KeyService for JsonKeyService {
    async fn unlock(&self, request: UnlockRequest) -> Result<String, KeyError> {
        let UnlockRequest {
            article_id,
            code,
            fingerprint,
        } = request;

        if !self.articles().await.iter().any(|a| a.id == article_id) {
            return Err(KeyError::ArticleNotFound);
        }

        let settings: Settings = self.store.load(Document::Settings).await;
        let max_devices = settings.max_devices();
        let now = Utc::now();

        let verdict = {
            let (code, article_id, fingerprint) = (&code, &article_id, fingerprint.as_deref());
            self.store
                .update::<Vec<KeyRecord>, _, _>(Document::Keys, move |keys| {
                    let redemption = redeem(keys, code, article_id, fingerprint, now, max_devices);
                    Outcome {
                        value: redemption.verdict,
                        dirty: redemption.dirty,
                    }
                })
                .await?
        };

        record_redemption(verdict, &code, &article_id, max_devices);
        verdict?;

        let markdown = self.content.read_article(&article_id).await.map_err(|e| {
            warn!(article_id = %article_id, error = %e, "Failed to read unlocked article body");
            KeyError::ContentReadFailure
        })?;

        Ok(render_markdown(&markdown))
    }

    async fn generate(
        &self,
        count: usize,
        duration_hours: i64,
    ) -> Result<Vec<KeyRecord>, KeyError> {
        if count == 0 || count > MAX_KEYS_PER_BATCH {
            return Err(KeyError::Validation(format!(
                "Key count must be between 1 and {MAX_KEYS_PER_BATCH}"
            )));
        }
        if !(UNLIMITED_DURATION..=MAX_DURATION_HOURS).contains(&duration_hours) {
            return Err(KeyError::Validation(format!(
                "Duration must be -1 (unlimited) or between 0 and {MAX_DURATION_HOURS} hours"
            )));
        }

        let now = Utc::now();
        let created = self
            .store
            .update::<Vec<KeyRecord>, _, _>(Document::Keys, move |keys| {
                let mut rng = rand::rng();
                let mut taken: HashSet<String> = keys.iter().map(|k| k.code.clone()).collect();
                let mut fresh = Vec::with_capacity(count);
                while fresh.len() < count {
                    let code = generate_key_code(&mut rng);
                    if taken.insert(code.clone()) {
                        fresh.push(KeyRecord::new(code, duration_hours, now));
                    }
                }

                // Each new key goes on top, so the last one generated is listed first.
                let mut merged: Vec<KeyRecord> = fresh.iter().rev().cloned().collect();
                merged.append(keys);
                *keys = merged;
                Outcome::changed(fresh)
            })
            .await?;

        metrics::counter!("keys_generated_total").increment(created.len() as u64);
        info!(count = created.len(), duration_hours, "Generated keys");
        Ok(created)
    }

    async fn list(&self, sort: KeySort, request: PageRequest) -> Result<Page<KeyView>, KeyError> {
        let mut keys: Vec<KeyRecord> = self.store.load(Document::Keys).await;
        let articles = self.articles().await;

        sort_keys(&mut keys, sort);
        let page = paginate(keys, request, &self.bounds);

        Ok(page.map(|key| {
            let bound_article_title = key
                .bound_article_id
                .as_deref()
                .and_then(|id| articles.iter().find(|a| a.id == id))
                .map(|a| a.title.clone());
            let deletable = check_deletable(&key, |id| articles.iter().any(|a| a.id == id)).is_ok();
            KeyView {
                key,
                bound_article_title,
                deletable,
            }
        }))
    }

    async fn delete(&self, code: &str) -> Result<(), KeyError> {
        let code = code.trim();
        let articles = self.articles().await;

        let result = self
            .store
            .update::<Vec<KeyRecord>, _, _>(Document::Keys, |keys| {
                let Some(pos) = keys.iter().position(|k| k.code == code) else {
                    return Outcome::unchanged(Err(KeyError::NotFound));
                };
                if check_deletable(&keys[pos], |id| articles.iter().any(|a| a.id == id)).is_err() {
                    return Outcome::unchanged(Err(KeyError::Forbidden));
                }
                keys.remove(pos);
                Outcome::changed(Ok(()))
            })
            .await?;

        match &result {
            Ok(()) => info!(code, "Deleted key"),
            Err(KeyError::NotFound) => warn!(code, "Key not found"),
            Err(_) => warn!(code, "Refused to delete used key"),
        }
        result
    }

    async fn make_unlimited(&self) -> Result<usize, KeyError> {
        let changed = self
            .store
            .update::<Vec<KeyRecord>, _, _>(Document::Keys, |keys| {
                let changed = keys::make_unlimited(keys);
                Outcome {
                    value: changed,
                    dirty: changed > 0,
                }
            })
            .await?;

        info!(changed, "Converted keys to unlimited duration");
        Ok(changed)
    }

    async fn purge_orphans(&self) -> Result<Vec<String>, KeyError> {
        let articles = self.articles().await;

        let purged = self
            .store
            .update::<Vec<KeyRecord>, _, _>(Document::Keys, |keys| {
                let orphans = orphaned_codes(keys, &articles);
                if orphans.is_empty() {
                    return Outcome::unchanged(orphans);
                }
                keys.retain(|k| !orphans.contains(&k.code));
                Outcome::changed(orphans)
            })
            .await?;

        if !purged.is_empty() {
            info!(count = purged.len(), "Purged keys bound to deleted articles");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::domain::KeyStatus;

    async fn fixture() -> (JsonKeyService, Store, ContentStore) {
        let root = std::env::temp_dir().join(format!("keymark-keys-{}", uuid::Uuid::new_v4()));
        let store = Store::new(&root);
        store.ensure_layout().await.unwrap();
        let content = ContentStore::new(&root);

        let article = Article::new("post-1".into(), "First".into(), "s".into(), Utc::now());
        store.save(Document::Articles, &vec![article]).await.unwrap();
        content.write_article("post-1", "# Body").await.unwrap();

        let service = JsonKeyService::new(
            store.clone(),
            content.clone(),
            PageBounds::new(5, 1, 100),
        );
        (service, store, content)
    }

    fn unlock(code: &str, article_id: &str, fingerprint: &str) -> UnlockRequest {
        UnlockRequest {
            article_id: article_id.to_string(),
            code: code.to_string(),
            fingerprint: Some(fingerprint.to_string()),
        }
    }

    #[tokio::test]
    async fn generate_refuses_undecodable_key_file() {
        let (service, store, _) = fixture().await;
        let raw = r#"[{"code":"KMGOOD00001","status":"unused","create_time":"2025-01-01T00:00:00Z","duration_hours":24},{"code":"KMODD000001","status":"unused","create_time":"2025-01-01T00:00:00Z","duration_hours":null}]"#;
        tokio::fs::write(store.path(Document::Keys), raw)
            .await
            .unwrap();

        let err = service.generate(1, 24).await.unwrap_err();
        assert!(matches!(
            err,
            KeyError::Storage(StoreError::Quarantined { .. })
        ));

        let on_disk = tokio::fs::read_to_string(store.path(Document::Keys))
            .await
            .unwrap();
        assert!(on_disk.contains("KMGOOD00001"));
    }

    #[tokio::test]
    async fn unlock_with_oversized_duration_does_not_abort() {
        let (service, store, _) = fixture().await;
        let key = KeyRecord::new("KMHUGE00001", 10_000_000_000, Utc::now());
        store.save(Document::Keys, &vec![key]).await.unwrap();

        let html = service
            .unlock(unlock("KMHUGE00001", "post-1", "fp-1"))
            .await
            .unwrap();
        assert!(html.contains("<h1>Body</h1>"));

        let keys: Vec<KeyRecord> = store.load(Document::Keys).await;
        assert_eq!(keys[0].status, KeyStatus::Active);
        assert!(keys[0].expire_time.is_none());
    }

    #[tokio::test]
    async fn generated_keys_are_prepended_newest_first() {
        let (service, store, _) = fixture().await;

        let first = service.generate(1, 24).await.unwrap();
        let batch = service.generate(3, UNLIMITED_DURATION).await.unwrap();

        let keys: Vec<KeyRecord> = store.load(Document::Keys).await;
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0].code, batch[2].code);
        assert_eq!(keys[2].code, batch[0].code);
        assert_eq!(keys[3].code, first[0].code);
        assert!(keys.iter().all(|k| k.status == KeyStatus::Unused));
    }

    #[tokio::test]
    async fn generate_rejects_bad_input() {
        let (service, _, _) = fixture().await;

        assert!(matches!(
            service.generate(0, 24).await,
            Err(KeyError::Validation(_))
        ));
        assert!(matches!(
            service.generate(1, -5).await,
            Err(KeyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unlock_returns_rendered_body_and_persists_binding() {
        let (service, store, _) = fixture().await;
        let code = service.generate(1, 24).await.unwrap()[0].code.clone();

        let html = service.unlock(unlock(&code, "post-1", "fp-1")).await.unwrap();
        assert!(html.contains("<h1>Body</h1>"));

        let keys: Vec<KeyRecord> = store.load(Document::Keys).await;
        assert_eq!(keys[0].status, KeyStatus::Active);
        assert_eq!(keys[0].bound_article_id.as_deref(), Some("post-1"));
    }

    #[tokio::test]
    async fn unlock_of_unknown_article_leaves_key_unused() {
        let (service, store, _) = fixture().await;
        let code = service.generate(1, 24).await.unwrap()[0].code.clone();

        let err = service.unlock(unlock(&code, "post-404", "fp")).await.unwrap_err();
        assert!(matches!(err, KeyError::ArticleNotFound));

        let keys: Vec<KeyRecord> = store.load(Document::Keys).await;
        assert_eq!(keys[0].status, KeyStatus::Unused);
    }

    #[tokio::test]
    async fn missing_body_reports_content_read_failure() {
        let (service, _, content) = fixture().await;
        let code = service.generate(1, 24).await.unwrap()[0].code.clone();
        content.delete_article("post-1").await.unwrap();

        let err = service.unlock(unlock(&code, "post-1", "fp")).await.unwrap_err();
        assert_eq!(err.to_string(), "文章内容读取失败");
    }

    #[tokio::test]
    async fn used_key_becomes_deletable_once_article_is_gone() {
        let (service, store, _) = fixture().await;
        let code = service.generate(1, 24).await.unwrap()[0].code.clone();
        service.unlock(unlock(&code, "post-1", "fp")).await.unwrap();

        assert!(matches!(
            service.delete(&code).await,
            Err(KeyError::Forbidden)
        ));

        store
            .save(Document::Articles, &Vec::<Article>::new())
            .await
            .unwrap();
        service.delete(&format!("  {code} ")).await.unwrap();
        assert!(matches!(
            service.delete(&code).await,
            Err(KeyError::NotFound)
        ));
    }

    #[tokio::test]
    async fn listing_reports_titles_and_deletability() {
        let (service, _, _) = fixture().await;
        let codes = service.generate(6, 24).await.unwrap();
        service
            .unlock(unlock(&codes[0].code, "post-1", "fp"))
            .await
            .unwrap();

        let page = service
            .list(KeySort::StatusAsc, PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 6);
        assert_eq!(page.limit, 5);
        assert_eq!(page.items.len(), 5);
        let active = &page.items[0];
        assert_eq!(active.key.status, KeyStatus::Active);
        assert_eq!(active.bound_article_title.as_deref(), Some("First"));
        assert!(!active.deletable);
        assert!(page.items[1].deletable);
    }

    #[tokio::test]
    async fn purge_removes_only_orphans() {
        let (service, store, _) = fixture().await;
        let codes = service.generate(2, 24).await.unwrap();
        service
            .unlock(unlock(&codes[0].code, "post-1", "fp"))
            .await
            .unwrap();
        store
            .save(Document::Articles, &Vec::<Article>::new())
            .await
            .unwrap();

        let purged = service.purge_orphans().await.unwrap();
        assert_eq!(purged, vec![codes[0].code.clone()]);

        let keys: Vec<KeyRecord> = store.load(Document::Keys).await;
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, codes[1].code);
    }
}
