//! TOTP enrollment and verification for the admin login.

use serde::Serialize;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum TwoFactorError {
    #[error("Invalid 2FA secret: {0}")]
    InvalidSecret(String),

    #[error("Failed to build enrollment QR code: {0}")]
    QrCode(String),

    #[error("System clock error: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

/// A fresh secret awaiting confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    /// Base32 secret, shown for manual entry.
    pub secret: String,
    pub otpauth_url: String,
    /// PNG data URL encoding `otpauth_url`.
    pub qr_code: String,
}

#[derive(Debug, Clone)]
pub struct TwoFactor {
    issuer: String,
    account_name: String,
}

impl TwoFactor {
    pub fn new(issuer: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            account_name: account_name.into(),
        }
    }

    fn totp(&self, secret: &str) -> Result<TOTP, TwoFactorError> {
        let bytes = Secret::Encoded(secret.trim().to_string())
            .to_bytes()
            .map_err(|e| TwoFactorError::InvalidSecret(format!("{e:?}")))?;
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP_SECONDS,
            bytes,
            Some(self.issuer.clone()),
            self.account_name.clone(),
        ))
    }

    /// Generates a new secret and its enrollment QR code.
    pub fn enroll(&self) -> Result<Enrollment, TwoFactorError> {
        let secret = Secret::generate_secret().to_encoded().to_string();
        let totp = self.totp(&secret)?;
        let qr = totp.get_qr_base64().map_err(TwoFactorError::QrCode)?;

        Ok(Enrollment {
            otpauth_url: totp.get_url(),
            qr_code: format!("data:image/png;base64,{qr}"),
            secret,
        })
    }

    /// Checks a six-digit code against `secret`, allowing one step of drift.
    pub fn verify(&self, secret: &str, token: &str) -> Result<bool, TwoFactorError> {
        let token = token.trim();
        if token.len() != DIGITS || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }
        Ok(self.totp(secret)?.check_current(token)?)
    }

    /// The code an authenticator app would show right now.
    pub fn current_code(&self, secret: &str) -> Result<String, TwoFactorError> {
        Ok(self.totp(secret)?.generate_current()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_factor() -> TwoFactor {
        TwoFactor::new("keymark", "admin")
    }

    #[test]
    fn enrollment_produces_png_data_url() {
        let enrollment = two_factor().enroll().unwrap();

        assert!(enrollment.qr_code.starts_with("data:image/png;base64,"));
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(!enrollment.secret.is_empty());
    }

    #[test]
    fn current_code_verifies() {
        let tf = two_factor();
        let secret = tf.enroll().unwrap().secret;
        let code = tf.current_code(&secret).unwrap();

        assert!(tf.verify(&secret, &code).unwrap());
    }

    #[test]
    fn malformed_tokens_are_rejected_without_error() {
        let tf = two_factor();
        let secret = tf.enroll().unwrap().secret;

        assert!(!tf.verify(&secret, "").unwrap());
        assert!(!tf.verify(&secret, "12ab56").unwrap());
        assert!(!tf.verify(&secret, "1234567").unwrap());
    }

    #[test]
    fn garbage_secret_is_an_error() {
        assert!(two_factor().verify("not base32 !!", "123456").is_err());
    }
}
