use serde::{Deserialize, Serialize};

use crate::catalog::{Movie, MovieDetails, MovieId};
use crate::query::{LoadState, Query};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub id: String,
}

/// A movie with its image references resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieView {
    #[serde(flatten)]
    pub movie: Movie,
    pub year: Option<i32>,
    pub poster_url: String,
    pub backdrop_url: String,
    pub genres: Vec<String>,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetailsView {
    #[serde(flatten)]
    pub details: MovieDetails,
    pub year: Option<i32>,
    pub poster_url: String,
    pub backdrop_url: String,
    /// e.g. "2h 28m"
    pub runtime_text: Option<String>,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingView {
    pub query: Query,
    #[serde(rename = "searchInput")]
    pub search_input: String,
    #[serde(rename = "searchPending")]
    pub search_pending: bool,
    pub load: LoadState,
    pub stale: bool,
    pub movies: Vec<MovieView>,
    pub page: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: Option<u32>,
    #[serde(rename = "totalResults")]
    pub total_results: Option<u64>,
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviePageView {
    pub page: u32,
    pub movies: Vec<MovieView>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "totalResults")]
    pub total_results: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub term: String,
}

/// One filter form field. The value is taken as the form sends it, string
/// or number.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterBody {
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterBody {
    pub fn value_str(&self) -> String {
        match &self.value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageBody {
    pub page: u32,
}

/// Either a full movie as shown in a listing, or just its id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToggleBody {
    Movie(Movie),
    Id { id: MovieId },
}

impl ToggleBody {
    pub fn id(&self) -> MovieId {
        match self {
            ToggleBody::Movie(m) => m.id,
            ToggleBody::Id { id } => *id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResult {
    pub id: MovieId,
    pub favorite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub session: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn format_runtime(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(148), "2h 28m");
        assert_eq!(format_runtime(45), "0h 45m");
    }

    #[test]
    fn test_filter_value_forms() {
        let body: FilterBody = serde_json::from_value(json!({"field": "year", "value": 1999})).unwrap();
        assert_eq!(body.value_str(), "1999");
        let body: FilterBody = serde_json::from_value(json!({"field": "year", "value": "1999"})).unwrap();
        assert_eq!(body.value_str(), "1999");
        let body: FilterBody = serde_json::from_value(json!({"field": "year"})).unwrap();
        assert_eq!(body.value_str(), "");
    }

    #[test]
    fn test_toggle_body_forms() {
        let body: ToggleBody = serde_json::from_value(json!({"id": 27205})).unwrap();
        assert!(matches!(body, ToggleBody::Id { id: MovieId(27205) }));

        let body: ToggleBody = serde_json::from_value(json!({
            "id": 27205,
            "title": "Inception",
            "overview": "",
            "poster_path": "/p.jpg",
            "backdrop_path": null,
            "release_date": "2010-07-15",
            "vote_average": 8.4,
            "vote_count": 36000,
            "genre_ids": [28]
        }))
        .unwrap();
        match body {
            ToggleBody::Movie(m) => assert_eq!(m.title, "Inception"),
            other => panic!("expected full movie, got {:?}", other),
        }
    }
}
