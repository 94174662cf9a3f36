//! JSON-document implementation of the `ArticleService` trait.

use async_trait::async_trait;
use chrono::{Local, Utc};
use tracing::{info, warn};

use crate::db::content::is_safe_id;
use crate::db::{ContentStore, Document, Outcome, Store};
use crate::domain::{Article, Settings, new_article_id};
use crate::gate::{UnlockTokens, is_locked};
use crate::listing::{ArticleSort, Page, PageBounds, PageRequest, paginate, sort_articles};
use crate::services::article_service::{
    ArticleDetail, ArticleDraft, ArticleError, ArticleInput, ArticleService,
    CONTENT_UNAVAILABLE_HTML, HOT_ARTICLE_COUNT, PublicListing,
};
use crate::services::markdown::render_markdown;

pub struct JsonArticleService {
    store: Store,
    content: ContentStore,
    public_bounds: PageBounds,
    admin_bounds: PageBounds,
}

impl JsonArticleService {
    #[must_use]
    pub const fn new(
        store: Store,
        content: ContentStore,
        public_bounds: PageBounds,
        admin_bounds: PageBounds,
    ) -> Self {
        Self {
            store,
            content,
            public_bounds,
            admin_bounds,
        }
    }

    async fn articles(&self) -> Vec<Article> {
        self.store.load(Document::Articles).await
    }

    /// Applies `edit` to one article and persists the result.
    async fn modify(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Article) + Send,
    ) -> Result<Article, ArticleError> {
        self.store
            .update::<Vec<Article>, _, _>(Document::Articles, |articles| {
                match articles.iter_mut().find(|a| a.id == id) {
                    Some(article) => {
                        edit(article);
                        Outcome::changed(Some(article.clone()))
                    }
                    None => Outcome::unchanged(None),
                }
            })
            .await?
            .ok_or(ArticleError::NotFound)
    }

    async fn create(&self, input: ArticleInput) -> Result<Article, ArticleError> {
        let id = new_article_id(Local::now(), &mut rand::rng());
        let mut article = Article::new(id, input.title, input.summary, Utc::now());
        article.hidden = input.hidden;
        article.requires_key = input.requires_key;

        self.content.write_article(&article.id, &input.content).await?;

        let stored = article.clone();
        self.store
            .update::<Vec<Article>, _, _>(Document::Articles, move |articles| {
                articles.insert(0, stored);
                Outcome::changed(())
            })
            .await?;

        info!(article_id = %article.id, title = %article.title, "Created article");
        Ok(article)
    }
}

#[async_trait]
impl ArticleService for JsonArticleService {
    async fn list_public(&self, request: PageRequest) -> Result<PublicListing, ArticleError> {
        let visible: Vec<Article> = self
            .articles()
            .await
            .into_iter()
            .filter(|a| !a.hidden)
            .collect();

        let mut hot = visible.clone();
        sort_articles(&mut hot, ArticleSort::ViewsDesc);
        hot.truncate(HOT_ARTICLE_COUNT);

        Ok(PublicListing {
            page: paginate(visible, request, &self.public_bounds),
            hot,
        })
    }

    async fn view(
        &self,
        id: &str,
        tokens: &(dyn UnlockTokens + Send + Sync),
    ) -> Result<ArticleDetail, ArticleError> {
        let article = self
            .store
            .update::<Vec<Article>, _, _>(Document::Articles, |articles| {
                match articles.iter_mut().find(|a| a.id == id && !a.hidden) {
                    Some(article) => {
                        article.views = article.views.saturating_add(1);
                        Outcome::changed(Some(article.clone()))
                    }
                    None => Outcome::unchanged(None),
                }
            })
            .await?
            .ok_or(ArticleError::NotFound)?;

        metrics::counter!("article_views_total").increment(1);

        let settings: Settings = self.store.load(Document::Settings).await;
        let locked = is_locked(&article, &settings, tokens);

        let content = if locked {
            None
        } else {
            match self.content.read_article(&article.id).await {
                Ok(markdown) => Some(render_markdown(&markdown)),
                Err(e) => {
                    warn!(article_id = %article.id, error = %e, "Failed to read article body");
                    Some(CONTENT_UNAVAILABLE_HTML.to_string())
                }
            }
        };

        Ok(ArticleDetail {
            article,
            locked,
            content,
        })
    }

    async fn list_admin(
        &self,
        sort: ArticleSort,
        request: PageRequest,
    ) -> Result<Page<Article>, ArticleError> {
        let mut articles = self.articles().await;
        sort_articles(&mut articles, sort);
        Ok(paginate(articles, request, &self.admin_bounds))
    }

    async fn get_for_edit(&self, id: &str) -> Result<ArticleDraft, ArticleError> {
        let article = self
            .articles()
            .await
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(ArticleError::NotFound)?;

        let content = self.content.read_article(id).await.unwrap_or_default();
        Ok(ArticleDraft { article, content })
    }

    async fn save(&self, input: ArticleInput) -> Result<Article, ArticleError> {
        if input.title.trim().is_empty() {
            return Err(ArticleError::Validation("Title is required".to_string()));
        }

        let Some(id) = input.id.clone().filter(|id| !id.is_empty()) else {
            return self.create(input).await;
        };
        if !is_safe_id(&id) {
            return Err(ArticleError::Validation(format!("Invalid article id: {id}")));
        }

        let ArticleInput {
            title,
            summary,
            content,
            hidden,
            requires_key,
            ..
        } = input;

        let article = self
            .modify(&id, move |article| {
                article.title = title;
                article.summary = summary;
                article.hidden = hidden;
                article.requires_key = requires_key;
            })
            .await?;
        self.content.write_article(&id, &content).await?;

        info!(article_id = %id, "Updated article");
        Ok(article)
    }

    async fn toggle_visibility(&self, id: &str) -> Result<Article, ArticleError> {
        let article = self.modify(id, |a| a.hidden = !a.hidden).await?;
        info!(article_id = %id, hidden = article.hidden, "Toggled article visibility");
        Ok(article)
    }

    async fn toggle_key_requirement(&self, id: &str) -> Result<Article, ArticleError> {
        let article = self.modify(id, |a| a.requires_key = !a.requires_key).await?;
        info!(
            article_id = %id,
            requires_key = article.requires_key,
            "Toggled article key requirement"
        );
        Ok(article)
    }

    async fn delete(&self, id: &str) -> Result<(), ArticleError> {
        let removed = self
            .store
            .update::<Vec<Article>, _, _>(Document::Articles, |articles| {
                let before = articles.len();
                articles.retain(|a| a.id != id);
                let removed = articles.len() != before;
                Outcome {
                    value: removed,
                    dirty: removed,
                }
            })
            .await?;

        if !removed {
            return Err(ArticleError::NotFound);
        }

        if let Err(e) = self.content.delete_article(id).await {
            warn!(article_id = %id, error = %e, "Failed to delete article body");
        }
        info!(article_id = %id, "Deleted article");
        Ok(())
    }
}
