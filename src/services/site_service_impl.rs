//! JSON-document implementation of the `SiteService` trait.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use mime_guess::mime;
use tokio::fs;
use tracing::{debug, info};

use crate::db::{ContentStore, Document, Outcome, StaticPage, Store};
use crate::domain::Settings;
use crate::services::site_service::{
    QR_IMAGE_STEM, QrUpload, SettingsError, SettingsUpdate, SiteService,
};

pub struct JsonSiteService {
    store: Store,
    content: ContentStore,
    images_dir: PathBuf,
    guide_path: PathBuf,
}

impl JsonSiteService {
    #[must_use]
    pub const fn new(
        store: Store,
        content: ContentStore,
        images_dir: PathBuf,
        guide_path: PathBuf,
    ) -> Self {
        Self {
            store,
            content,
            images_dir,
            guide_path,
        }
    }

    /// Writes the QR image under its fixed name and returns its public URL.
    async fn store_qr_image(&self, upload: &QrUpload) -> Result<String, SettingsError> {
        if upload.bytes.is_empty() {
            return Err(SettingsError::Validation("QR image is empty".to_string()));
        }
        let ext = image_extension(&upload.file_name)?;
        let file_name = format!("{QR_IMAGE_STEM}.{ext}");

        fs::create_dir_all(&self.images_dir).await?;
        fs::write(self.images_dir.join(&file_name), &upload.bytes).await?;

        info!(file = %file_name, bytes = upload.bytes.len(), "Replaced QR image");
        Ok(format!(
            "/images/{file_name}?v={}",
            Utc::now().timestamp_millis()
        ))
    }
}

/// Lower-cased extension of an uploaded raster image.
fn image_extension(file_name: &str) -> Result<String, SettingsError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| SettingsError::Validation("QR image needs a file extension".to_string()))?;

    let is_raster = mime_guess::from_ext(&ext)
        .first()
        .is_some_and(|m| m.type_() == mime::IMAGE && m.subtype() != mime::SVG);
    if !is_raster || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SettingsError::Validation(format!(
            "Unsupported QR image type: .{ext}"
        )));
    }
    Ok(ext)
}

#[async_trait]
impl SiteService for JsonSiteService {
    async fn settings(&self) -> Settings {
        self.store.load(Document::Settings).await
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings, SettingsError> {
        let qr_url = match &update.qr_image {
            Some(upload) => Some(self.store_qr_image(upload).await?),
            None => None,
        };

        let settings = self
            .store
            .update::<Settings, _, _>(Document::Settings, move |settings| {
                settings.site_name = update.site_name;
                if let Some(password) = update.admin_password.filter(|p| !p.is_empty()) {
                    settings.admin_password = password;
                }
                settings.popup_title = update.popup_title;
                settings.watermark_text = update.watermark_text;
                settings.default_key_duration_hours = update.default_key_duration_hours;
                settings.max_devices_per_key = update.max_devices_per_key;
                settings.enable_key_verification = update.enable_key_verification;
                if let Some(url) = qr_url {
                    settings.wechat_qr_image = Some(url);
                }
                Outcome::changed(settings.clone())
            })
            .await?;

        info!(
            site_name = %settings.site_name,
            enable_key_verification = settings.enable_key_verification,
            max_devices_per_key = settings.max_devices_per_key,
            "Settings updated"
        );
        Ok(settings)
    }

    async fn page(&self, page: StaticPage) -> Result<String, SettingsError> {
        Ok(self
            .content
            .read_page(page)
            .await?
            .unwrap_or_else(|| page.fallback().to_string()))
    }

    async fn save_page(&self, page: StaticPage, markdown: &str) -> Result<(), SettingsError> {
        self.content.write_page(page, markdown).await?;
        info!(page = page.file_name(), bytes = markdown.len(), "Saved page");
        Ok(())
    }

    async fn guide(&self) -> Result<String, SettingsError> {
        match fs::read_to_string(&self.guide_path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.guide_path.display(), "Guide file not found");
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fixture() -> (JsonSiteService, PathBuf) {
        let root = std::env::temp_dir().join(format!("keymark-site-{}", uuid::Uuid::new_v4()));
        let store = Store::new(root.join("data"));
        store.ensure_layout().await.unwrap();
        store
            .save(Document::Settings, &Settings::bootstrap())
            .await
            .unwrap();
        let service = JsonSiteService::new(
            store,
            ContentStore::new(root.join("data")),
            root.join("images"),
            root.join("USER_GUIDE.md"),
        );
        (service, root)
    }

    fn form() -> SettingsUpdate {
        SettingsUpdate {
            site_name: "Renamed".into(),
            admin_password: Some(String::new()),
            popup_title: "Unlock".into(),
            watermark_text: "wm".into(),
            default_key_duration_hours: 48,
            max_devices_per_key: 3,
            enable_key_verification: false,
            qr_image: None,
        }
    }

    #[tokio::test]
    async fn empty_password_keeps_the_stored_one() {
        let (service, _) = fixture().await;

        let settings = service.update_settings(form()).await.unwrap();

        assert_eq!(settings.admin_password, "admin");
        assert_eq!(settings.site_name, "Renamed");
        assert_eq!(settings.max_devices(), 3);
        assert!(!settings.enable_key_verification);
    }

    #[tokio::test]
    async fn new_password_replaces_the_old_one() {
        let (service, _) = fixture().await;
        let update = SettingsUpdate {
            admin_password: Some("s3cret".into()),
            ..form()
        };

        let settings = service.update_settings(update).await.unwrap();
        assert_eq!(settings.admin_password, "s3cret");
    }

    #[tokio::test]
    async fn qr_upload_is_stored_under_fixed_name() {
        let (service, root) = fixture().await;
        let update = SettingsUpdate {
            qr_image: Some(QrUpload {
                file_name: "My Code.PNG".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
            ..form()
        };

        let settings = service.update_settings(update).await.unwrap();

        let url = settings.wechat_qr_image.unwrap();
        assert!(url.starts_with("/images/qr-custom.png?v="), "{url}");
        assert!(root.join("images/qr-custom.png").exists());
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let (service, _) = fixture().await;
        for name in ["payload.html", "vector.svg", "noext"] {
            let update = SettingsUpdate {
                qr_image: Some(QrUpload {
                    file_name: name.into(),
                    bytes: vec![1, 2, 3],
                }),
                ..form()
            };
            assert!(matches!(
                service.update_settings(update).await,
                Err(SettingsError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn privacy_page_falls_back_to_default_text() {
        let (service, _) = fixture().await;

        let privacy = service.page(StaticPage::Privacy).await.unwrap();
        assert!(privacy.starts_with("# 隐私政策"));
        assert_eq!(service.page(StaticPage::About).await.unwrap(), "");

        service.save_page(StaticPage::About, "# Hi").await.unwrap();
        assert_eq!(service.page(StaticPage::About).await.unwrap(), "# Hi");
    }

    #[tokio::test]
    async fn missing_guide_reads_empty() {
        let (service, _) = fixture().await;
        assert!(service.guide().await.unwrap().is_empty());
    }
}
