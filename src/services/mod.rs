pub mod markdown;
pub use markdown::render_markdown;

pub mod two_factor;
pub use two_factor::{Enrollment, TwoFactor, TwoFactorError};

pub mod key_service;
pub mod key_service_impl;
pub use key_service::{KeyError, KeyService, KeyView, UnlockRequest};
pub use key_service_impl::JsonKeyService;

pub mod article_service;
pub mod article_service_impl;
pub use article_service::{
    ArticleDetail, ArticleDraft, ArticleError, ArticleInput, ArticleService, PublicListing,
};
pub use article_service_impl::JsonArticleService;

pub mod site_service;
pub mod site_service_impl;
pub use site_service::{QrUpload, SettingsError, SettingsUpdate, SiteService};
pub use site_service_impl::JsonSiteService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginOutcome};
pub use auth_service_impl::JsonAuthService;
