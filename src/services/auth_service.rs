//! Domain service for admin authentication.
//!
//! There is a single admin identified by the password in the settings
//! document, optionally guarded by a TOTP second factor.

use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::two_factor::{Enrollment, TwoFactorError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("密码错误")]
    InvalidPassword,

    #[error("验证码错误")]
    InvalidToken,

    #[error("Two-factor error: {0}")]
    TwoFactor(#[from] TwoFactorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated,
    /// Password accepted; a one-time code must accompany the next attempt.
    TwoFactorRequired,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks the admin password and, when enabled, the one-time code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPassword`] or [`AuthError::InvalidToken`].
    async fn login(&self, password: &str, token: Option<&str>) -> Result<LoginOutcome, AuthError>;

    /// Issues a new secret for enrollment. Nothing is stored yet.
    async fn begin_two_factor(&self) -> Result<Enrollment, AuthError>;

    /// Stores `secret` and enables 2FA if `token` is currently valid for it.
    async fn enable_two_factor(&self, secret: &str, token: &str) -> Result<(), AuthError>;

    async fn disable_two_factor(&self) -> Result<(), AuthError>;
}
