use serde::{Deserialize, Serialize};

use crate::listing::PageRequest;

use super::validation::parse_int_prefix;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// `?page=&limit=` as sent by the front end. Values are parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest::new(
            self.page.as_deref().and_then(parse_int_prefix),
            self.limit.as_deref().and_then(parse_int_prefix),
        )
    }
}

/// `?sort=&page=&limit=` for the single admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct SortedPageQuery {
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// Rendered markdown page.
#[derive(Debug, Serialize)]
pub struct PageDto {
    pub title: String,
    pub html: String,
}

/// Raw markdown for the page editors.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkdownDto {
    pub content: String,
}
