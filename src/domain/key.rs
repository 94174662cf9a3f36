use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// Sentinel `duration_hours` for keys that never expire.
pub const UNLIMITED_DURATION: i64 = -1;

const CODE_PREFIX: &str = "KM";
const CODE_BODY_LEN: usize = 9;
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Lifecycle state of a license key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Unused,
    Active,
    Expired,
}

impl KeyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses order by their name, so `active < expired < unused`.
impl Ord for KeyStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for KeyStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A redeemable license key ("card code").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub code: String,

    pub status: KeyStatus,

    #[serde(default)]
    pub bound_article_id: Option<String>,

    #[serde(default)]
    pub create_time: DateTime<Utc>,

    #[serde(default)]
    pub activate_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,

    #[serde(default = "default_duration")]
    pub duration_hours: i64,

    #[serde(default)]
    pub fingerprints: Vec<String>,
}

const fn default_duration() -> i64 {
    UNLIMITED_DURATION
}

impl KeyRecord {
    /// Creates a fresh, unbound key.
    #[must_use]
    pub fn new(code: impl Into<String>, duration_hours: i64, now: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            status: KeyStatus::Unused,
            bound_article_id: None,
            create_time: now,
            activate_time: None,
            expire_time: None,
            duration_hours,
            fingerprints: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.duration_hours == UNLIMITED_DURATION
    }

    /// Binds the key to `article_id` and starts its validity window.
    pub fn activate(&mut self, article_id: &str, fingerprint: Option<&str>, now: DateTime<Utc>) {
        self.status = KeyStatus::Active;
        self.bound_article_id = Some(article_id.to_string());
        self.activate_time = Some(now);
        self.fingerprints.clear();
        if let Some(fp) = fingerprint {
            self.fingerprints.push(fp.to_string());
        }
        if !self.is_unlimited() {
            self.expire_time = Duration::try_hours(self.duration_hours)
                .and_then(|window| now.checked_add_signed(window));
            if self.expire_time.is_none() {
                warn!(
                    code = %self.code,
                    duration_hours = self.duration_hours,
                    "Key duration out of range, key will not expire"
                );
            }
        }
    }

    /// Whether the validity window has closed at `now`.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expire_time.is_some_and(|expire| now >= expire)
    }

    #[must_use]
    pub fn has_fingerprint(&self, fingerprint: &str) -> bool {
        self.fingerprints.iter().any(|fp| fp == fingerprint)
    }
}

/// Generates a key code of the form `KM` + nine base-36 characters.
pub fn generate_key_code<R: Rng>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_PREFIX.len() + CODE_BODY_LEN);
    code.push_str(CODE_PREFIX);
    for _ in 0..CODE_BODY_LEN {
        let idx = rng.random_range(0..CODE_ALPHABET.len());
        code.push(char::from(CODE_ALPHABET[idx]));
    }
    code
}
