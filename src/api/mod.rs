use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

mod admin_articles;
pub mod auth;
mod dashboard;
mod error;
mod keys;
mod observability;
mod pages;
mod reader;
mod settings;
mod two_factor;
mod types;
mod unlock;
mod validation;

pub use error::ApiError;
pub use types::*;
pub use unlock::{UnlockPayload, UnlockResponse};

use crate::services::{ArticleService, AuthService, KeyService, SiteService};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn key_service(&self) -> &Arc<dyn KeyService> {
        &self.shared.key_service
    }

    #[must_use]
    pub fn article_service(&self) -> &Arc<dyn ArticleService> {
        &self.shared.article_service
    }

    #[must_use]
    pub fn site_service(&self) -> &Arc<dyn SiteService> {
        &self.shared.site_service
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config().server;
    let images_path = state.config().general.images_path.clone();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )));

    let api_router = Router::new()
        .nest("/admin", create_admin_router())
        .route("/site", get(settings::public_settings))
        .route("/articles", get(reader::list_articles))
        .route("/articles/{id}", get(reader::get_article))
        .route("/unlock", post(unlock::unlock))
        .route("/pages/about", get(pages::about))
        .route("/pages/privacy", get(pages::privacy))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/health", get(observability::health))
        .route("/metrics", get(observability::get_metrics))
        .layer(session_layer)
        .with_state(state);

    Router::new()
        .nest("/api", api_router)
        .nest_service("/images", tower_http::services::ServeDir::new(images_path))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}

fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route(
            "/articles",
            get(admin_articles::list_articles).post(admin_articles::save_article),
        )
        .route(
            "/articles/{id}",
            get(admin_articles::get_article).delete(admin_articles::delete_article),
        )
        .route(
            "/articles/{id}/toggle-visibility",
            post(admin_articles::toggle_visibility),
        )
        .route(
            "/articles/{id}/toggle-key-requirement",
            post(admin_articles::toggle_key_requirement),
        )
        .route("/keys", get(keys::list_keys))
        .route("/keys/generate", post(keys::generate_keys))
        .route("/keys/{code}", delete(keys::delete_key))
        .route(
            "/settings",
            get(settings::admin_settings).post(settings::update_settings),
        )
        .route(
            "/about",
            get(pages::about_source).put(pages::save_about_source),
        )
        .route(
            "/privacy",
            get(pages::privacy_source).put(pages::save_privacy_source),
        )
        .route("/guide", get(pages::guide))
        .route("/2fa/setup", get(two_factor::setup))
        .route("/2fa/verify", post(two_factor::verify))
        .route("/2fa/disable", post(two_factor::disable))
        .route_layer(middleware::from_fn(auth::auth_middleware))
}
