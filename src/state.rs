use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::db::{ContentStore, Document, Store};
use crate::domain::Settings;
use crate::services::{
    ArticleService, AuthService, JsonArticleService, JsonAuthService, JsonKeyService,
    JsonSiteService, KeyService, SiteService, TwoFactor,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub content: ContentStore,

    pub key_service: Arc<dyn KeyService>,

    pub article_service: Arc<dyn ArticleService>,

    pub site_service: Arc<dyn SiteService>,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir();
        let store = Store::new(&data_dir);
        store.ensure_layout().await?;
        bootstrap_settings(&store).await?;

        let content = ContentStore::new(&data_dir);
        let listing = &config.listing;

        let key_service = Arc::new(JsonKeyService::new(
            store.clone(),
            content.clone(),
            listing.admin_keys,
        )) as Arc<dyn KeyService + Send + Sync + 'static>;

        let article_service = Arc::new(JsonArticleService::new(
            store.clone(),
            content.clone(),
            listing.public_articles,
            listing.admin_articles,
        )) as Arc<dyn ArticleService + Send + Sync + 'static>;

        let site_service = Arc::new(JsonSiteService::new(
            store.clone(),
            content.clone(),
            PathBuf::from(&config.general.images_path),
            PathBuf::from(&config.general.guide_path),
        )) as Arc<dyn SiteService + Send + Sync + 'static>;

        let two_factor = TwoFactor::new(
            config.two_factor.issuer.clone(),
            config.two_factor.account_name.clone(),
        );
        let auth_service = Arc::new(JsonAuthService::new(store.clone(), two_factor))
            as Arc<dyn AuthService + Send + Sync + 'static>;

        Ok(Self {
            config: Arc::new(config),
            store,
            content,
            key_service,
            article_service,
            site_service,
            auth_service,
        })
    }
}

/// Writes first-run settings so the admin can log in with the bootstrap password.
async fn bootstrap_settings(store: &Store) -> anyhow::Result<()> {
    if store.exists(Document::Settings) {
        return Ok(());
    }

    store
        .save(Document::Settings, &Settings::bootstrap())
        .await?;
    info!(
        path = %store.path(Document::Settings).display(),
        "Created initial settings"
    );
    warn!("Admin password is the default; change it in the admin settings");
    Ok(())
}
