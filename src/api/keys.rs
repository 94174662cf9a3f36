use axum::{
    Form, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{key_count, key_duration, validate_key_code};
use super::{ApiError, ApiResponse, AppState, SortedPageQuery};
use crate::domain::KeyRecord;
use crate::listing::{KeySort, Page};
use crate::services::KeyView;

/// Both fields arrive as raw form text and are parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateKeysForm {
    pub duration: Option<String>,
    pub count: Option<String>,
}

/// GET /admin/keys
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SortedPageQuery>,
) -> Result<Json<ApiResponse<Page<KeyView>>>, ApiError> {
    let sort = KeySort::parse_or_default(query.sort.as_deref());
    let page = state.key_service().list(sort, query.page.request()).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /admin/keys/generate
pub async fn generate_keys(
    State(state): State<Arc<AppState>>,
    Form(form): Form<GenerateKeysForm>,
) -> Result<Json<ApiResponse<Vec<KeyRecord>>>, ApiError> {
    let duration = key_duration(form.duration.as_deref());
    let count = key_count(form.count.as_deref())?;

    let keys = state.key_service().generate(count, duration).await?;
    Ok(Json(ApiResponse::success(keys)))
}

/// DELETE /admin/keys/{code}
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let code = validate_key_code(&code)?;
    state.key_service().delete(code).await?;
    Ok(Json(ApiResponse::success(())))
}
