//! JSON-document implementation of the `AuthService` trait.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::db::{Document, Outcome, Store};
use crate::domain::Settings;
use crate::services::auth_service::{AuthError, AuthService, LoginOutcome};
use crate::services::two_factor::{Enrollment, TwoFactor};

pub struct JsonAuthService {
    store: Store,
    two_factor: TwoFactor,
}

impl JsonAuthService {
    #[must_use]
    pub const fn new(store: Store, two_factor: TwoFactor) -> Self {
        Self { store, two_factor }
    }
}

/// Compares fixed-length digests so the comparison does not depend on
/// where the two passwords first differ.
fn password_matches(input: &str, stored: &str) -> bool {
    Sha256::digest(input.as_bytes()) == Sha256::digest(stored.as_bytes())
}

#[async_trait]
impl AuthService for JsonAuthService {
    async fn login(&self, password: &str, token: Option<&str>) -> Result<LoginOutcome, AuthError> {
        let settings: Settings = self.store.load(Document::Settings).await;

        if settings.admin_password.is_empty() {
            warn!("Login refused: no admin password is configured");
            return Err(AuthError::InvalidPassword);
        }
        if !password_matches(password, &settings.admin_password) {
            warn!("Login failed: wrong password");
            return Err(AuthError::InvalidPassword);
        }

        if !settings.two_fa_enabled {
            info!("Admin logged in");
            return Ok(LoginOutcome::Authenticated);
        }

        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return Ok(LoginOutcome::TwoFactorRequired);
        };
        let Some(secret) = settings.two_fa_secret.as_deref() else {
            warn!("2FA is enabled but no secret is stored");
            return Err(AuthError::InvalidToken);
        };

        if self.two_factor.verify(secret, token)? {
            info!("Admin logged in with 2FA");
            Ok(LoginOutcome::Authenticated)
        } else {
            warn!("Login failed: wrong 2FA code");
            Err(AuthError::InvalidToken)
        }
    }

    async fn begin_two_factor(&self) -> Result<Enrollment, AuthError> {
        Ok(self.two_factor.enroll()?)
    }

    async fn enable_two_factor(&self, secret: &str, token: &str) -> Result<(), AuthError> {
        if !self.two_factor.verify(secret, token)? {
            return Err(AuthError::InvalidToken);
        }

        let secret = secret.trim().to_string();
        self.store
            .update::<Settings, _, _>(Document::Settings, move |settings| {
                settings.two_fa_secret = Some(secret);
                settings.two_fa_enabled = true;
                Outcome::changed(())
            })
            .await?;

        info!("Two-factor authentication enabled");
        Ok(())
    }

    async fn disable_two_factor(&self) -> Result<(), AuthError> {
        self.store
            .update::<Settings, _, _>(Document::Settings, |settings| {
                settings.two_fa_enabled = false;
                settings.two_fa_secret = None;
                Outcome::changed(())
            })
            .await?;

        info!("Two-factor authentication disabled");
        Ok(())
    }
}
