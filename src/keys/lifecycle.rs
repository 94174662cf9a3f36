//! Redemption state machine for license keys.
//!
//! `unused --(first redeem)--> active --(redeem at/after expire_time)--> expired`
//!
//! A key is bound to the article it first unlocks and never re-bound. Each
//! active key accepts at most `max_devices` distinct fingerprints.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Article, KeyRecord, KeyStatus};

/// Why a redemption was refused. The messages are shown to readers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RedeemError {
    #[error("无效的卡密")]
    InvalidKey,

    #[error("卡密已过期")]
    KeyExpired,

    #[error("此卡密已绑定其他文章，请使用新卡密")]
    ArticleMismatch,

    #[error("此卡密已绑定其他设备，请使用新卡密")]
    DeviceLimitExceeded,
}

impl RedeemError {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid_key",
            Self::KeyExpired => "key_expired",
            Self::ArticleMismatch => "article_mismatch",
            Self::DeviceLimitExceeded => "device_limit_exceeded",
        }
    }
}

/// How a successful redemption was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// First use: the key was activated and bound to the article.
    Activated,
    /// An additional device was recorded on an active key.
    DeviceBound,
    /// Known device (or no fingerprint) on an active, unexpired key.
    Verified,
}

impl Grant {
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::DeviceBound => "device_bound",
            Self::Verified => "verified",
        }
    }
}

/// The verdict of [`redeem`] plus whether the key collection was modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    pub verdict: Result<Grant, RedeemError>,
    pub dirty: bool,
}

impl Redemption {
    const fn granted(grant: Grant, dirty: bool) -> Self {
        Self {
            verdict: Ok(grant),
            dirty,
        }
    }

    const fn denied(error: RedeemError, dirty: bool) -> Self {
        Self {
            verdict: Err(error),
            dirty,
        }
    }
}

/// Evaluates a redemption attempt and applies its state transition in place.
///
/// Empty fingerprints are treated as absent. The caller persists `keys` when
/// the returned [`Redemption`] is dirty; denials other than expiry leave the
/// collection untouched.
pub fn redeem(
    keys: &mut [KeyRecord],
    code: &str,
    article_id: &str,
    fingerprint: Option<&str>,
    now: DateTime<Utc>,
    max_devices: usize,
) -> Redemption {
    let fingerprint = fingerprint.filter(|fp| !fp.is_empty());

    let Some(key) = keys.iter_mut().find(|k| k.code == code) else {
        return Redemption::denied(RedeemError::InvalidKey, false);
    };

    match key.status {
        KeyStatus::Expired => Redemption::denied(RedeemError::KeyExpired, false),
        KeyStatus::Unused => {
            key.activate(article_id, fingerprint, now);
            Redemption::granted(Grant::Activated, true)
        }
        KeyStatus::Active => {
            if key.bound_article_id.as_deref() != Some(article_id) {
                return Redemption::denied(RedeemError::ArticleMismatch, false);
            }

            let mut grant = Grant::Verified;
            if let Some(fp) = fingerprint
                && !key.has_fingerprint(fp)
            {
                if key.fingerprints.len() >= max_devices {
                    return Redemption::denied(RedeemError::DeviceLimitExceeded, false);
                }
                key.fingerprints.push(fp.to_string());
                grant = Grant::DeviceBound;
            }

            if key.is_past_expiry(now) {
                key.status = KeyStatus::Expired;
                return Redemption::denied(RedeemError::KeyExpired, true);
            }

            Redemption::granted(grant, grant == Grant::DeviceBound)
        }
    }
}

/// Why an admin may not delete a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBlock {
    /// The key was redeemed and its article still exists.
    InUse,
}

/// A key may be deleted while unused, or once its bound article is gone.
pub fn check_deletable(
    key: &KeyRecord,
    article_exists: impl Fn(&str) -> bool,
) -> Result<(), DeleteBlock> {
    if key.status == KeyStatus::Unused {
        return Ok(());
    }
    match key.bound_article_id.as_deref() {
        Some(article_id) if !article_exists(article_id) => Ok(()),
        _ => Err(DeleteBlock::InUse),
    }
}

/// Converts every key to unlimited duration and revives expired keys.
///
/// Returns the number of records that changed.
pub fn make_unlimited(keys: &mut [KeyRecord]) -> usize {
    let mut changed = 0;
    for key in keys.iter_mut() {
        let before = key.clone();
        key.duration_hours = crate::domain::UNLIMITED_DURATION;
        if matches!(key.status, KeyStatus::Active | KeyStatus::Expired) {
            key.expire_time = None;
            key.status = KeyStatus::Active;
        }
        if *key != before {
            changed += 1;
        }
    }
    changed
}

/// Codes of keys bound to articles that no longer exist.
#[must_use]
pub fn orphaned_codes(keys: &[KeyRecord], articles: &[Article]) -> Vec<String> {
    keys.iter()
        .filter(|key| {
            key.bound_article_id
                .as_deref()
                .is_some_and(|id| !articles.iter().any(|a| a.id == id))
        })
        .map(|key| key.code.clone())
        .collect()
}
