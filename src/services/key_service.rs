//! Domain service for license keys: redemption and admin management.

use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::domain::KeyRecord;
use crate::keys::RedeemError;
use crate::listing::{KeySort, Page, PageRequest};

/// Largest batch accepted by a single generate request.
pub const MAX_KEYS_PER_BATCH: usize = 1000;

/// Longest finite validity window, in hours (about a century).
pub const MAX_DURATION_HOURS: i64 = 24 * 365 * 100;

/// Errors specific to key operations.
///
/// Display strings of the user-facing variants are shown to readers as-is.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error(transparent)]
    Redeem(#[from] RedeemError),

    #[error("文章内容读取失败")]
    ContentReadFailure,

    #[error("卡密不存在")]
    NotFound,

    #[error("已使用的卡密无法删除")]
    Forbidden,

    #[error("文章不存在")]
    ArticleNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// A reader's attempt to unlock one article with a key.
#[derive(Debug, Clone)]
pub struct UnlockRequest {
    pub article_id: String,
    pub code: String,
    pub fingerprint: Option<String>,
}

/// Key row as shown in the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct KeyView {
    #[serde(flatten)]
    pub key: KeyRecord,
    pub bound_article_title: Option<String>,
    pub deletable: bool,
}

/// Domain service trait for license keys.
#[async_trait::async_trait]
pub trait KeyService: Send + Sync {
    /// Redeems a key for an article and returns the rendered article body.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Redeem`] when the key is refused and
    /// [`KeyError::ContentReadFailure`] when the body cannot be read.
    async fn unlock(&self, request: UnlockRequest) -> Result<String, KeyError>;

    /// Creates `count` unused keys, stored ahead of existing ones.
    async fn generate(&self, count: usize, duration_hours: i64)
    -> Result<Vec<KeyRecord>, KeyError>;

    /// Sorted, paginated key listing for the admin panel.
    async fn list(&self, sort: KeySort, request: PageRequest) -> Result<Page<KeyView>, KeyError>;

    /// Deletes a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Forbidden`] when the key was redeemed and its
    /// article still exists.
    async fn delete(&self, code: &str) -> Result<(), KeyError>;

    /// Makes every key unlimited, reviving expired ones. Returns the number changed.
    async fn make_unlimited(&self) -> Result<usize, KeyError>;

    /// Deletes keys bound to articles that no longer exist. Returns their codes.
    async fn purge_orphans(&self) -> Result<Vec<String>, KeyError>;
}
