use serde::{Deserialize, Serialize};

use crate::catalog::{GenreId, Movie};

/// Highest page number the catalog will serve.
pub const MAX_PAGE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "popularity.desc")]
    PopularityDesc,
    #[serde(rename = "popularity.asc")]
    PopularityAsc,
    #[serde(rename = "vote_average.desc")]
    RatingDesc,
    #[serde(rename = "vote_average.asc")]
    RatingAsc,
    #[serde(rename = "release_date.desc")]
    ReleaseDesc,
    #[serde(rename = "release_date.asc")]
    ReleaseAsc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::PopularityDesc,
        SortKey::PopularityAsc,
        SortKey::RatingDesc,
        SortKey::RatingAsc,
        SortKey::ReleaseDesc,
        SortKey::ReleaseAsc,
    ];

    /// The value of the catalog's `sort_by` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::PopularityDesc => "popularity.desc",
            SortKey::PopularityAsc => "popularity.asc",
            SortKey::RatingDesc => "vote_average.desc",
            SortKey::RatingAsc => "vote_average.asc",
            SortKey::ReleaseDesc => "release_date.desc",
            SortKey::ReleaseAsc => "release_date.asc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    pub sort_by: SortKey,
    pub year: Option<i32>,
    pub genre: Option<GenreId>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub search: Option<String>,
    pub filters: FilterSet,
    pub page: u32,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            search: None,
            filters: FilterSet::default(),
            page: 1,
        }
    }
}

impl Query {
    /// The search term, if it selects search mode. Blank terms don't.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_search(&self) -> bool {
        self.search_term().is_some()
    }

    /// True when both queries select the same listing, ignoring the page.
    pub fn same_listing(&self, other: &Query) -> bool {
        self.search_term() == other.search_term() && self.filters == other.filters
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: Query,
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading,
    Success,
    Error(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}
