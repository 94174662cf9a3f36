//! Domain records persisted in the JSON documents.
//!
//! Field names follow the on-disk format so that existing data files load
//! unchanged.

pub mod article;
pub mod key;
pub mod settings;

pub use article::{Article, new_article_id};
pub use key::{KeyRecord, KeyStatus, UNLIMITED_DURATION, generate_key_code};
pub use settings::{AdminSettingsView, PublicSettings, Settings};
