use axum::{
    Json,
    extract::{Multipart, State},
};
use std::collections::HashMap;
use std::sync::Arc;

use super::validation::{int_or_default, is_checked};
use super::{ApiError, ApiResponse, AppState};
use crate::domain::UNLIMITED_DURATION;
use crate::domain::settings::{DEFAULT_KEY_DURATION_HOURS, DEFAULT_MAX_DEVICES};
use crate::domain::{AdminSettingsView, PublicSettings};
use crate::services::key_service::MAX_DURATION_HOURS;
use crate::services::{QrUpload, SettingsUpdate};

const QR_IMAGE_FIELD: &str = "qr_image";

/// GET /site
pub async fn public_settings(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PublicSettings>> {
    let settings = state.site_service().settings().await;
    Json(ApiResponse::success(settings.public_view()))
}

/// GET /admin/settings
pub async fn admin_settings(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<AdminSettingsView>> {
    let settings = state.site_service().settings().await;
    Json(ApiResponse::success(settings.admin_view()))
}

/// POST /admin/settings
/// Multipart form. Text fields are read leniently; `qr_image` is optional.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<AdminSettingsView>>, ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut qr_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid form data: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == QR_IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;
            // Browsers send an empty part when no file was chosen.
            if !file_name.is_empty() && !bytes.is_empty() {
                qr_image = Some(QrUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::validation(format!("Invalid field {name}: {e}")))?;
            fields.insert(name, value);
        }
    }

    let update = settings_update(&fields, qr_image);
    let settings = state.site_service().update_settings(update).await?;

    Ok(Json(ApiResponse::success(settings.admin_view())))
}

fn settings_update(fields: &HashMap<String, String>, qr_image: Option<QrUpload>) -> SettingsUpdate {
    let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
    let raw = |name: &str| fields.get(name).map(String::as_str);

    let max_devices = int_or_default(raw("max_devices_per_key"), i64::from(DEFAULT_MAX_DEVICES));

    SettingsUpdate {
        site_name: text("site_name"),
        admin_password: fields.get("admin_password").cloned(),
        popup_title: text("popup_title"),
        watermark_text: text("watermark_text"),
        default_key_duration_hours: int_or_default(
            raw("default_key_duration_hours"),
            DEFAULT_KEY_DURATION_HOURS,
        )
        .clamp(UNLIMITED_DURATION, MAX_DURATION_HOURS),
        max_devices_per_key: u32::try_from(max_devices).unwrap_or(DEFAULT_MAX_DEVICES),
        enable_key_verification: is_checked(raw("enable_key_verification")),
        qr_image,
    }
}
