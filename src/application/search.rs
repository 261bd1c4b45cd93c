//! Search request and result types shared by the orchestrator, the cache and
//! the HTTP surface.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::film::Film;

/// Sort keys the query builder knows how to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Rating,
    Title,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Rating => "rating",
            SortField::Title => "title",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortField(pub String);

impl fmt::Display for UnknownSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort field `{}`", self.0)
    }
}

impl FromStr for SortField {
    type Err = UnknownSortField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rating" | "imdb_rating" => Ok(SortField::Rating),
            "title" => Ok(SortField::Title),
            _ => Err(UnknownSortField(value.to_string())),
        }
    }
}

/// Parameters of a film search as supplied by the caller.
///
/// `page` is 1-based; `Some(0)` and `None` both mean "no explicit page".
/// `filter` does not influence the query today but is part of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub filter: Option<String>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Canonical form: blank strings become `None`, page 0 becomes `None`.
    pub fn normalized(&self) -> Self {
        Self {
            query: non_blank(self.query.as_deref()),
            sort: non_blank(self.sort.as_deref()),
            page: self.page.filter(|page| *page > 0),
            filter: non_blank(self.filter.as_deref()),
        }
    }

    /// Free-text query, if any. An absent query matches every document.
    pub fn text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }

    pub fn requested_page(&self) -> Option<u32> {
        self.page.filter(|page| *page > 0)
    }

    /// Recognized sort key; unknown keys resolve to `None`.
    pub fn sort_field(&self) -> Option<SortField> {
        self.sort.as_deref().and_then(|sort| sort.parse().ok())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Total hits reported by the index for the query.
    pub total: u64,
    /// Effective page number after pagination normalization.
    pub page: u32,
    pub results: Vec<Film>,
}
