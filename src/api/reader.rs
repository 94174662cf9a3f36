use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, PageQuery};
use crate::db::content::is_safe_id;
use crate::services::{ArticleDetail, ArticleError, PublicListing};

/// GET /articles
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PublicListing>>, ApiError> {
    let listing = state
        .article_service()
        .list_public(query.request())
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// GET /articles/{id}
/// Counts the view. The body is only included when the reader may see it.
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<ArticleDetail>>, ApiError> {
    if !is_safe_id(&id) {
        return Err(ArticleError::NotFound.into());
    }

    let detail = state.article_service().view(&id, &jar).await?;
    Ok(Json(ApiResponse::success(detail)))
}
