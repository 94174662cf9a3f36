use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MarkdownDto, PageDto};
use crate::db::StaticPage;
use crate::services::render_markdown;

const GUIDE_TITLE: &str = "使用指南";

async fn rendered(state: &AppState, page: StaticPage) -> Result<Json<ApiResponse<PageDto>>, ApiError> {
    let markdown = state.site_service().page(page).await?;
    Ok(Json(ApiResponse::success(PageDto {
        title: page.title().to_string(),
        html: render_markdown(&markdown),
    })))
}

async fn source(state: &AppState, page: StaticPage) -> Result<Json<ApiResponse<MarkdownDto>>, ApiError> {
    let content = state.site_service().page(page).await?;
    Ok(Json(ApiResponse::success(MarkdownDto { content })))
}

async fn save(
    state: &AppState,
    page: StaticPage,
    payload: MarkdownDto,
) -> Result<Json<ApiResponse<MarkdownDto>>, ApiError> {
    state
        .site_service()
        .save_page(page, &payload.content)
        .await?;
    Ok(Json(ApiResponse::success(payload)))
}

/// GET /pages/about
pub async fn about(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<PageDto>>, ApiError> {
    rendered(&state, StaticPage::About).await
}

/// GET /pages/privacy
pub async fn privacy(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PageDto>>, ApiError> {
    rendered(&state, StaticPage::Privacy).await
}

/// GET /admin/about
pub async fn about_source(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MarkdownDto>>, ApiError> {
    source(&state, StaticPage::About).await
}

/// PUT /admin/about
pub async fn save_about_source(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MarkdownDto>,
) -> Result<Json<ApiResponse<MarkdownDto>>, ApiError> {
    save(&state, StaticPage::About, payload).await
}

/// GET /admin/privacy
pub async fn privacy_source(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MarkdownDto>>, ApiError> {
    source(&state, StaticPage::Privacy).await
}

/// PUT /admin/privacy
pub async fn save_privacy_source(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MarkdownDto>,
) -> Result<Json<ApiResponse<MarkdownDto>>, ApiError> {
    save(&state, StaticPage::Privacy, payload).await
}

/// GET /admin/guide
pub async fn guide(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<PageDto>>, ApiError> {
    let markdown = state.site_service().guide().await?;
    Ok(Json(ApiResponse::success(PageDto {
        title: GUIDE_TITLE.to_string(),
        html: render_markdown(&markdown),
    })))
}
