//! Pagination and sorting shared by the public and admin listings.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Article, KeyRecord};

/// Allowed page sizes for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBounds {
    pub default_limit: usize,
    pub min_limit: usize,
    pub max_limit: usize,
}

impl PageBounds {
    #[must_use]
    pub const fn new(default_limit: usize, min_limit: usize, max_limit: usize) -> Self {
        Self {
            default_limit,
            min_limit,
            max_limit,
        }
    }

    /// Missing or non-positive limits fall back to the default, then clamp.
    #[must_use]
    pub fn limit(&self, requested: Option<i64>) -> usize {
        let limit = requested
            .filter(|l| *l >= 1)
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(self.default_limit);
        limit.clamp(self.min_limit, self.max_limit)
    }
}

/// Raw page request as parsed from a query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    #[must_use]
    pub const fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Slices `items` into the requested page.
///
/// A page past the end clamps to the last page; an empty collection keeps
/// the requested page and yields no items.
pub fn paginate<T>(items: Vec<T>, request: PageRequest, bounds: &PageBounds) -> Page<T> {
    let limit = bounds.limit(request.limit).max(1);
    let total = items.len();
    let total_pages = total.div_ceil(limit);

    let mut page = request
        .page
        .and_then(|p| usize::try_from(p).ok())
        .unwrap_or(1)
        .max(1);
    if total > 0 && page > total_pages {
        page = total_pages;
    }

    let start = (page - 1).saturating_mul(limit);
    let items = items.into_iter().skip(start).take(limit).collect();

    Page {
        page,
        limit,
        total,
        total_pages,
        items,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order: {0}")]
pub struct UnknownSort(String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleSort {
    DateAsc,
    #[default]
    DateDesc,
    ViewsAsc,
    ViewsDesc,
}

impl ArticleSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DateAsc => "date_asc",
            Self::DateDesc => "date_desc",
            Self::ViewsAsc => "views_asc",
            Self::ViewsDesc => "views_desc",
        }
    }

    /// Parses a query value, falling back to the default order.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for ArticleSort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_asc" => Ok(Self::DateAsc),
            "date_desc" => Ok(Self::DateDesc),
            "views_asc" => Ok(Self::ViewsAsc),
            "views_desc" => Ok(Self::ViewsDesc),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeySort {
    StatusAsc,
    #[default]
    StatusDesc,
    DurationAsc,
    DurationDesc,
    TimeAsc,
    TimeDesc,
}

impl KeySort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatusAsc => "status_asc",
            Self::StatusDesc => "status_desc",
            Self::DurationAsc => "duration_asc",
            Self::DurationDesc => "duration_desc",
            Self::TimeAsc => "time_asc",
            Self::TimeDesc => "time_desc",
        }
    }

    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for KeySort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status_asc" => Ok(Self::StatusAsc),
            "status_desc" => Ok(Self::StatusDesc),
            "duration_asc" => Ok(Self::DurationAsc),
            "duration_desc" => Ok(Self::DurationDesc),
            "time_asc" => Ok(Self::TimeAsc),
            "time_desc" => Ok(Self::TimeDesc),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}

/// Stable sort; articles with equal keys keep their stored order.
pub fn sort_articles(articles: &mut [Article], sort: ArticleSort) {
    match sort {
        ArticleSort::DateAsc => articles.sort_by(|a, b| a.date.cmp(&b.date)),
        ArticleSort::DateDesc => articles.sort_by(|a, b| b.date.cmp(&a.date)),
        ArticleSort::ViewsAsc => articles.sort_by_key(|a| a.views),
        ArticleSort::ViewsDesc => articles.sort_by(|a, b| b.views.cmp(&a.views)),
    }
}

/// Unlimited keys rank above every finite duration.
const fn duration_rank(key: &KeyRecord) -> i64 {
    if key.is_unlimited() {
        i64::MAX
    } else {
        key.duration_hours
    }
}

fn newest_first(a: &KeyRecord, b: &KeyRecord) -> Ordering {
    b.create_time.cmp(&a.create_time)
}

pub fn sort_keys(keys: &mut [KeyRecord], sort: KeySort) {
    match sort {
        KeySort::StatusAsc => {
            keys.sort_by(|a, b| a.status.cmp(&b.status).then_with(|| newest_first(a, b)));
        }
        KeySort::StatusDesc => {
            keys.sort_by(|a, b| b.status.cmp(&a.status).then_with(|| newest_first(a, b)));
        }
        KeySort::DurationAsc => keys.sort_by_key(duration_rank),
        KeySort::DurationDesc => keys.sort_by(|a, b| duration_rank(b).cmp(&duration_rank(a))),
        KeySort::TimeAsc => keys.sort_by(|a, b| a.create_time.cmp(&b.create_time)),
        KeySort::TimeDesc => keys.sort_by(newest_first),
    }
}
