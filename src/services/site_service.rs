//! Domain service for site settings and the static markdown pages.

use thiserror::Error;

use crate::db::{StaticPage, StoreError};
use crate::domain::Settings;

/// File stem of the replaceable QR image; the extension follows the upload.
pub const QR_IMAGE_STEM: &str = "qr-custom";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Replacement QR image as uploaded.
#[derive(Debug, Clone)]
pub struct QrUpload {
    /// Original file name; only its extension is used.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Admin settings form, already parsed.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub site_name: String,
    /// `None` leaves the stored password unchanged.
    pub admin_password: Option<String>,
    pub popup_title: String,
    pub watermark_text: String,
    pub default_key_duration_hours: i64,
    pub max_devices_per_key: u32,
    pub enable_key_verification: bool,
    pub qr_image: Option<QrUpload>,
}

#[async_trait::async_trait]
pub trait SiteService: Send + Sync {
    async fn settings(&self) -> Settings;

    /// Applies the settings form, storing a new QR image first if one was sent.
    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings, SettingsError>;

    /// Raw markdown of a static page, falling back to its built-in text.
    async fn page(&self, page: StaticPage) -> Result<String, SettingsError>;

    async fn save_page(&self, page: StaticPage, markdown: &str) -> Result<(), SettingsError>;

    /// Raw markdown of the admin guide; empty when the file is absent.
    async fn guide(&self) -> Result<String, SettingsError>;
}
