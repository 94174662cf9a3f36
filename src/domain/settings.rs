use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_MAX_DEVICES: u32 = 2;
pub const DEFAULT_KEY_DURATION_HOURS: i64 = 24;
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin";

const PASSWORD_MASK: &str = "********";

/// Site-wide settings, stored as a single JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site_name: String,

    /// Stored as entered; login compares digests of both sides.
    pub admin_password: String,

    pub popup_title: String,

    pub watermark_text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_qr_image: Option<String>,

    pub two_fa_enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_fa_secret: Option<String>,

    /// Older data may hold a negative cap; it reads as zero, i.e. the default.
    #[serde(deserialize_with = "lenient_device_cap")]
    pub max_devices_per_key: u32,

    pub default_key_duration_hours: i64,

    pub enable_key_verification: bool,

    /// Fields this version does not know about are kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_device_cap<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(u32::try_from(raw).unwrap_or(if raw < 0 { 0 } else { u32::MAX }))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_name: "My Blog".to_string(),
            admin_password: String::new(),
            popup_title: String::new(),
            watermark_text: String::new(),
            wechat_qr_image: None,
            two_fa_enabled: false,
            two_fa_secret: None,
            max_devices_per_key: DEFAULT_MAX_DEVICES,
            default_key_duration_hours: DEFAULT_KEY_DURATION_HOURS,
            enable_key_verification: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Settings written on first start, before any admin has logged in.
    #[must_use]
    pub fn bootstrap() -> Self {
        Self {
            admin_password: BOOTSTRAP_ADMIN_PASSWORD.to_string(),
            ..Self::default()
        }
    }

    /// Device cap per key; a stored zero falls back to the default.
    #[must_use]
    pub const fn max_devices(&self) -> usize {
        if self.max_devices_per_key == 0 {
            DEFAULT_MAX_DEVICES as usize
        } else {
            self.max_devices_per_key as usize
        }
    }

    #[must_use]
    pub fn public_view(&self) -> PublicSettings {
        PublicSettings {
            site_name: self.site_name.clone(),
            popup_title: self.popup_title.clone(),
            watermark_text: self.watermark_text.clone(),
            wechat_qr_image: self.wechat_qr_image.clone(),
            enable_key_verification: self.enable_key_verification,
        }
    }

    #[must_use]
    pub fn admin_view(&self) -> AdminSettingsView {
        AdminSettingsView {
            site_name: self.site_name.clone(),
            admin_password: PASSWORD_MASK.to_string(),
            popup_title: self.popup_title.clone(),
            watermark_text: self.watermark_text.clone(),
            wechat_qr_image: self.wechat_qr_image.clone(),
            two_fa_enabled: self.two_fa_enabled,
            max_devices_per_key: self.max_devices_per_key,
            default_key_duration_hours: self.default_key_duration_hours,
            enable_key_verification: self.enable_key_verification,
        }
    }
}

/// Settings visible to anonymous readers.
#[derive(Debug, Clone, Serialize)]
pub struct PublicSettings {
    pub site_name: String,
    pub popup_title: String,
    pub watermark_text: String,
    pub wechat_qr_image: Option<String>,
    pub enable_key_verification: bool,
}

/// Settings as shown in the admin panel, with secrets masked.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSettingsView {
    pub site_name: String,
    pub admin_password: String,
    pub popup_title: String,
    pub watermark_text: String,
    pub wechat_qr_image: Option<String>,
    pub two_fa_enabled: bool,
    pub max_devices_per_key: u32,
    pub default_key_duration_hours: i64,
    pub enable_key_verification: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"site_name":"Notes","admin_password":"pw"}"#).unwrap();

        assert_eq!(settings.site_name, "Notes");
        assert!(settings.enable_key_verification);
        assert_eq!(settings.max_devices(), 2);
        assert_eq!(settings.default_key_duration_hours, 24);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = r#"{"site_name":"Notes","custom_footer":"hi"}"#;
        let settings: Settings = serde_json::from_str(raw).unwrap();
        let value = serde_json::to_value(&settings).unwrap();

        assert_eq!(value["custom_footer"], "hi");
    }

    #[test]
    fn negative_device_cap_still_loads() {
        let raw = r#"{"admin_password":"pw","two_fa_secret":"JBSWY3DPEHPK3PXP","max_devices_per_key":-3}"#;
        let settings: Settings = serde_json::from_str(raw).unwrap();

        assert_eq!(settings.admin_password, "pw");
        assert_eq!(settings.two_fa_secret.as_deref(), Some("JBSWY3DPEHPK3PXP"));
        assert_eq!(settings.max_devices(), 2);
    }

    #[test]
    fn zero_device_cap_falls_back_to_default() {
        let settings = Settings {
            max_devices_per_key: 0,
            ..Settings::default()
        };
        assert_eq!(settings.max_devices(), 2);
    }

    #[test]
    fn admin_view_masks_password_and_secret() {
        let settings = Settings {
            admin_password: "hunter2".into(),
            two_fa_secret: Some("JBSWY3DPEHPK3PXP".into()),
            two_fa_enabled: true,
            ..Settings::default()
        };
        let value = serde_json::to_value(settings.admin_view()).unwrap();

        assert_eq!(value["admin_password"], "********");
        assert!(value.get("two_fa_secret").is_none());
    }
}
