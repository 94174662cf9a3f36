use axum::{
    Form, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::{is_checked, validate_article_id};
use super::{ApiError, ApiResponse, AppState, SortedPageQuery};
use crate::domain::Article;
use crate::listing::{ArticleSort, Page};
use crate::services::{ArticleDraft, ArticleInput};

/// Form fields posted by the article editor.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleForm {
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    pub hidden: Option<String>,
    #[serde(rename = "requiresKey")]
    pub requires_key: Option<String>,
}

impl From<ArticleForm> for ArticleInput {
    fn from(form: ArticleForm) -> Self {
        Self {
            id: form
                .id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            title: form.title.trim().to_string(),
            summary: form.summary,
            content: form.content,
            hidden: is_checked(form.hidden.as_deref()),
            requires_key: is_checked(form.requires_key.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub id: String,
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
pub struct KeyRequirementResponse {
    pub id: String,
    #[serde(rename = "requiresKey")]
    pub requires_key: bool,
}

/// GET /admin/articles
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SortedPageQuery>,
) -> Result<Json<ApiResponse<Page<Article>>>, ApiError> {
    let sort = ArticleSort::parse_or_default(query.sort.as_deref());
    let page = state
        .article_service()
        .list_admin(sort, query.page.request())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /admin/articles/{id}
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ArticleDraft>>, ApiError> {
    let id = validate_article_id(&id)?;
    let draft = state.article_service().get_for_edit(id).await?;
    Ok(Json(ApiResponse::success(draft)))
}

/// POST /admin/articles
/// Creates when `id` is absent, updates otherwise.
pub async fn save_article(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ArticleForm>,
) -> Result<Json<ApiResponse<Article>>, ApiError> {
    let input = ArticleInput::from(form);
    if let Some(id) = input.id.as_deref() {
        validate_article_id(id)?;
    }

    let article = state.article_service().save(input).await?;
    Ok(Json(ApiResponse::success(article)))
}

/// POST /admin/articles/{id}/toggle-visibility
pub async fn toggle_visibility(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VisibilityResponse>>, ApiError> {
    let id = validate_article_id(&id)?;
    let article = state.article_service().toggle_visibility(id).await?;
    Ok(Json(ApiResponse::success(VisibilityResponse {
        id: article.id,
        hidden: article.hidden,
    })))
}

/// POST /admin/articles/{id}/toggle-key-requirement
pub async fn toggle_key_requirement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<KeyRequirementResponse>>, ApiError> {
    let id = validate_article_id(&id)?;
    let article = state.article_service().toggle_key_requirement(id).await?;
    Ok(Json(ApiResponse::success(KeyRequirementResponse {
        id: article.id,
        requires_key: article.requires_key,
    })))
}

/// DELETE /admin/articles/{id}
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = validate_article_id(&id)?;
    state.article_service().delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}
