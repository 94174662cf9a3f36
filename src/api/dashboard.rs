use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::parse_int_prefix;
use super::{ApiError, ApiResponse, AppState};
use crate::domain::{AdminSettingsView, Article};
use crate::listing::{ArticleSort, KeySort, Page, PageRequest};
use crate::services::KeyView;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub section: Option<String>,
    pub sort: Option<String>,
    pub article_page: Option<String>,
    pub article_limit: Option<String>,
    pub key_sort: Option<String>,
    pub key_page: Option<String>,
    pub key_limit: Option<String>,
}

impl DashboardQuery {
    /// Explicit `section` wins; otherwise the panel the query targets.
    fn active_section(&self) -> String {
        let given = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

        if let Some(section) = self.section.as_deref().filter(|s| !s.is_empty()) {
            section.to_string()
        } else if given(&self.sort) || given(&self.article_page) {
            "articles".to_string()
        } else if given(&self.key_sort) || given(&self.key_page) {
            "keys".to_string()
        } else {
            "dashboard".to_string()
        }
    }
}

fn page_request(page: Option<&str>, limit: Option<&str>) -> PageRequest {
    PageRequest::new(
        page.and_then(parse_int_prefix),
        limit.and_then(parse_int_prefix),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub settings: AdminSettingsView,
    pub active_section: String,
    pub article_sort: &'static str,
    pub key_sort: &'static str,
    pub articles: Page<Article>,
    pub keys: Page<KeyView>,
}

/// GET /admin/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let article_sort = ArticleSort::parse_or_default(query.sort.as_deref());
    let key_sort = KeySort::parse_or_default(query.key_sort.as_deref());

    let settings = state.site_service().settings().await;
    let articles = state
        .article_service()
        .list_admin(
            article_sort,
            page_request(query.article_page.as_deref(), query.article_limit.as_deref()),
        )
        .await?;
    let keys = state
        .key_service()
        .list(
            key_sort,
            page_request(query.key_page.as_deref(), query.key_limit.as_deref()),
        )
        .await?;

    Ok(Json(ApiResponse::success(DashboardResponse {
        settings: settings.admin_view(),
        active_section: query.active_section(),
        article_sort: article_sort.as_str(),
        key_sort: key_sort.as_str(),
        articles,
        keys,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_section_follows_query() {
        let query = DashboardQuery::default();
        assert_eq!(query.active_section(), "dashboard");

        let query = DashboardQuery {
            key_page: Some("2".into()),
            ..DashboardQuery::default()
        };
        assert_eq!(query.active_section(), "keys");

        let query = DashboardQuery {
            sort: Some("views_desc".into()),
            key_page: Some("2".into()),
            ..DashboardQuery::default()
        };
        assert_eq!(query.active_section(), "articles");

        let query = DashboardQuery {
            section: Some("settings".into()),
            sort: Some("views_desc".into()),
            ..DashboardQuery::default()
        };
        assert_eq!(query.active_section(), "settings");
    }
}
