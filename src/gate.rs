//! Per-request visibility of article bodies.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::domain::{Article, Settings};

const UNLOCK_COOKIE_PREFIX: &str = "unlocked_";
const UNLOCK_COOKIE_MAX_AGE_DAYS: i64 = 365;

/// Proof that the reader already unlocked an article earlier.
pub trait UnlockTokens {
    fn has_valid_unlock_token(&self, article_id: &str) -> bool;
}

impl UnlockTokens for CookieJar {
    fn has_valid_unlock_token(&self, article_id: &str) -> bool {
        self.get(&unlock_cookie_name(article_id))
            .is_some_and(|cookie| cookie.value() == "true")
    }
}

/// A reader with no prior unlocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTokens;

impl UnlockTokens for NoTokens {
    fn has_valid_unlock_token(&self, _article_id: &str) -> bool {
        false
    }
}

#[must_use]
pub fn unlock_cookie_name(article_id: &str) -> String {
    format!("{UNLOCK_COOKIE_PREFIX}{article_id}")
}

/// Cookie remembering a successful unlock of `article_id`.
#[must_use]
pub fn unlock_cookie(article_id: &str) -> Cookie<'static> {
    Cookie::build((unlock_cookie_name(article_id), "true"))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(UNLOCK_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Whether the body of `article` must be withheld from this reader.
pub fn is_locked<T>(article: &Article, settings: &Settings, tokens: &T) -> bool
where
    T: UnlockTokens + ?Sized,
{
    if !settings.enable_key_verification || !article.requires_key {
        return false;
    }
    !tokens.has_valid_unlock_token(&article.id)
}
