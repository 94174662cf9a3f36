//! Domain service for articles: public reading and admin editing.

use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::domain::Article;
use crate::gate::UnlockTokens;
use crate::listing::{ArticleSort, Page, PageRequest};

/// How many articles the "hot" sidebar shows.
pub const HOT_ARTICLE_COUNT: usize = 10;

/// Shown in place of a body that could not be read.
pub const CONTENT_UNAVAILABLE_HTML: &str = "<p>内容读取失败</p>";

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("文章不存在")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Content I/O error: {0}")]
    Content(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Front page: one page of visible articles plus the most viewed ones.
#[derive(Debug, Clone, Serialize)]
pub struct PublicListing {
    #[serde(flatten)]
    pub page: Page<Article>,
    pub hot: Vec<Article>,
}

/// An article as served to a reader.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub locked: bool,
    /// Rendered HTML, present only when unlocked.
    pub content: Option<String>,
}

/// An article with its raw markdown, for the editor.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDraft {
    #[serde(flatten)]
    pub article: Article,
    pub content: String,
}

/// Editor submission. A missing `id` creates a new article.
#[derive(Debug, Clone, Default)]
pub struct ArticleInput {
    pub id: Option<String>,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub hidden: bool,
    pub requires_key: bool,
}

#[async_trait::async_trait]
pub trait ArticleService: Send + Sync {
    /// Visible articles in stored order, plus the hot list.
    async fn list_public(&self, request: PageRequest) -> Result<PublicListing, ArticleError>;

    /// Loads a visible article for reading and counts the view.
    ///
    /// # Errors
    ///
    /// Returns [`ArticleError::NotFound`] for missing or hidden articles.
    async fn view(
        &self,
        id: &str,
        tokens: &(dyn UnlockTokens + Send + Sync),
    ) -> Result<ArticleDetail, ArticleError>;

    async fn list_admin(
        &self,
        sort: ArticleSort,
        request: PageRequest,
    ) -> Result<Page<Article>, ArticleError>;

    /// Metadata plus raw markdown. A missing body reads as empty.
    async fn get_for_edit(&self, id: &str) -> Result<ArticleDraft, ArticleError>;

    /// Creates or updates an article and writes its body.
    async fn save(&self, input: ArticleInput) -> Result<Article, ArticleError>;

    async fn toggle_visibility(&self, id: &str) -> Result<Article, ArticleError>;

    async fn toggle_key_requirement(&self, id: &str) -> Result<Article, ArticleError>;

    /// Removes the metadata entry and body. Keys bound to it become deletable.
    async fn delete(&self, id: &str) -> Result<(), ArticleError>;
}
