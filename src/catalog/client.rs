use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::query::Query;

use super::error::FetchError;
use super::types::*;
use super::wire::*;

/// The movie catalog as seen by the rest of the crate. Each call is exactly
/// one outbound request; nothing here retries.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Free-text search when the query carries a search term, filter-driven
    /// discovery otherwise.
    async fn search(&self, query: &Query) -> Result<MoviePage, FetchError>;
    async fn movie_details(&self, id: MovieId) -> Result<MovieDetails, FetchError>;
    async fn genres(&self) -> Result<Vec<Genre>, FetchError>;
    async fn trending(&self, window: TrendingWindow, page: u32) -> Result<MoviePage, FetchError>;
    async fn list(&self, list: MovieList, page: u32) -> Result<MoviePage, FetchError>;
}

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    fn get(&self, path: &str, page: Option<u32>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())]);
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        request
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FetchError> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Validation(e.to_string()))
    }
}

/// Translate a non-2xx response into a service error, preferring the
/// service's own `status_message`.
async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<RawStatus>(&body)
        .ok()
        .and_then(|s| s.status_message)
        .unwrap_or_else(|| match status.canonical_reason() {
            Some(reason) if body.trim().is_empty() => reason.to_string(),
            _ => body.trim().to_string(),
        });

    Err(FetchError::Service {
        status: status.as_u16(),
        message,
    })
}

/// Query-string parameters for the filter set. Absent filters are left out.
pub fn filter_params(query: &Query) -> Vec<(&'static str, String)> {
    let filters = &query.filters;
    let mut params = vec![("sort_by", filters.sort_by.as_str().to_string())];
    if let Some(year) = filters.year {
        params.push(("primary_release_year", year.to_string()));
    }
    if let Some(genre) = filters.genre {
        params.push(("with_genres", genre.to_string()));
    }
    if let Some(rating) = filters.min_rating {
        params.push(("vote_average.gte", rating.to_string()));
    }
    params
}

#[async_trait]
impl Catalog for TmdbClient {
    async fn search(&self, query: &Query) -> Result<MoviePage, FetchError> {
        let mut request = match query.search_term() {
            Some(term) => {
                debug!(term, page = query.page, "catalog search");
                self.get("/search/movie", Some(query.page))
                    .query(&[("query", term)])
            }
            None => {
                debug!(filters = ?query.filters, page = query.page, "catalog discover");
                self.get("/discover/movie", Some(query.page))
            }
        };
        // The search endpoint ignores what it doesn't support.
        request = request.query(&filter_params(query));

        let raw: RawPage = self.send(request).await?;
        MoviePage::try_from(raw)
    }

    async fn movie_details(&self, id: MovieId) -> Result<MovieDetails, FetchError> {
        debug!(%id, "catalog movie details");
        let raw: RawMovieDetails = self.send(self.get(&format!("/movie/{}", id), None)).await?;
        MovieDetails::try_from(raw)
    }

    async fn genres(&self) -> Result<Vec<Genre>, FetchError> {
        debug!("catalog genre list");
        let raw: RawGenreList = self.send(self.get("/genre/movie/list", None)).await?;
        Vec::<Genre>::try_from(raw)
    }

    async fn trending(&self, window: TrendingWindow, page: u32) -> Result<MoviePage, FetchError> {
        debug!(window = window.as_str(), page, "catalog trending");
        let path = format!("/trending/movie/{}", window.as_str());
        let raw: RawPage = self.send(self.get(&path, Some(page))).await?;
        MoviePage::try_from(raw)
    }

    async fn list(&self, list: MovieList, page: u32) -> Result<MoviePage, FetchError> {
        debug!(list = list.as_str(), page, "catalog list");
        let path = format!("/movie/{}", list.as_str());
        let raw: RawPage = self.send(self.get(&path, Some(page))).await?;
        MoviePage::try_from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterSet, SortKey};
    use axum::{
        extract::{Path, Query as AxumQuery},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    type Params = AxumQuery<HashMap<String, String>>;

    /// Echo the request back inside an otherwise valid page so the tests can
    /// see which endpoint was hit with which parameters.
    fn echo_page(endpoint: &str, params: HashMap<String, String>) -> Json<serde_json::Value> {
        Json(json!({
            "page": params.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(1),
            "results": [{
                "id": 1,
                "title": endpoint,
                "overview": serde_json::to_string(&params).unwrap(),
                "release_date": "2008-07-16",
                "vote_average": 8.5,
                "vote_count": 30000,
                "genre_ids": [28]
            }],
            "total_pages": 5,
            "total_results": 100
        }))
    }

    async fn discover(AxumQuery(params): Params) -> impl IntoResponse {
        if params.get("api_key").map(String::as_str) != Some("secret") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "status_code": 7,
                    "status_message": "Invalid API key: You must be granted a valid key.",
                    "success": false
                })),
            )
                .into_response();
        }
        echo_page("discover", params).into_response()
    }

    async fn search(AxumQuery(params): Params) -> impl IntoResponse {
        echo_page("search", params)
    }

    async fn details(Path(id): Path<u64>) -> impl IntoResponse {
        if id != 155 {
            return (StatusCode::NOT_FOUND, "").into_response();
        }
        Json(json!({
            "id": 155,
            "title": "The Dark Knight",
            "release_date": "2008-07-16",
            "runtime": 152,
            "budget": 185000000,
            "genres": [{"id": 18, "name": "Drama"}]
        }))
        .into_response()
    }

    async fn genres() -> impl IntoResponse {
        Json(json!({"genres": [{"id": 28, "name": "Action"}, {"id": 12, "name": "Adventure"}]}))
    }

    async fn trending(Path(window): Path<String>, AxumQuery(params): Params) -> impl IntoResponse {
        echo_page(&format!("trending/{}", window), params)
    }

    async fn broken() -> impl IntoResponse {
        Json(json!({"results": "nope"}))
    }

    async fn spawn_catalog() -> CatalogConfig {
        let app = Router::new()
            .route("/discover/movie", get(discover))
            .route("/search/movie", get(search))
            .route("/movie/popular", get(broken))
            .route("/movie/:id", get(details))
            .route("/genre/movie/list", get(genres))
            .route("/trending/movie/:window", get(trending));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        CatalogConfig {
            api_key: "secret".to_string(),
            base_url: format!("http://{}", addr),
            ..CatalogConfig::default()
        }
    }

    fn echoed_params(page: &MoviePage) -> HashMap<String, String> {
        serde_json::from_str(&page.movies[0].overview).unwrap()
    }

    #[tokio::test]
    async fn test_discover_without_search_term() {
        let client = TmdbClient::new(&spawn_catalog().await).unwrap();
        let query = Query {
            search: Some("  ".to_string()),
            filters: FilterSet {
                sort_by: SortKey::RatingDesc,
                year: Some(2008),
                genre: None,
                min_rating: Some(7.0),
            },
            page: 2,
        };

        let page = client.search(&query).await.unwrap();
        assert_eq!(page.movies[0].title, "discover");
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 5);

        let params = echoed_params(&page);
        assert_eq!(params["sort_by"], "vote_average.desc");
        assert_eq!(params["primary_release_year"], "2008");
        assert_eq!(params["vote_average.gte"], "7");
        assert_eq!(params["language"], "en-US");
        assert!(!params.contains_key("with_genres"));
        assert!(!params.contains_key("query"));
    }

    #[tokio::test]
    async fn test_search_with_term() {
        let client = TmdbClient::new(&spawn_catalog().await).unwrap();
        let query = Query {
            search: Some("batman".to_string()),
            ..Query::default()
        };

        let page = client.search(&query).await.unwrap();
        assert_eq!(page.movies[0].title, "search");
        let params = echoed_params(&page);
        assert_eq!(params["query"], "batman");
        assert_eq!(params["page"], "1");
    }

    #[tokio::test]
    async fn test_service_error_carries_status_message() {
        let mut config = spawn_catalog().await;
        config.api_key = "wrong".to_string();
        let client = TmdbClient::new(&config).unwrap();

        let err = client.search(&Query::default()).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Service {
                status: 401,
                message: "Invalid API key: You must be granted a valid key.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_details_and_not_found() {
        let client = TmdbClient::new(&spawn_catalog().await).unwrap();

        let details = client.movie_details(MovieId(155)).await.unwrap();
        assert_eq!(details.movie.title, "The Dark Knight");
        assert_eq!(details.runtime, Some(152));
        assert_eq!(details.genres[0].name, "Drama");

        let err = client.movie_details(MovieId(1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_genres_and_trending() {
        let client = TmdbClient::new(&spawn_catalog().await).unwrap();

        let genres = client.genres().await.unwrap();
        assert_eq!(genres.len(), 2);
        assert_eq!(genres[0], Genre { id: GenreId(28), name: "Action".to_string() });

        let page = client.trending(TrendingWindow::Week, 1).await.unwrap();
        assert_eq!(page.movies[0].title, "trending/week");
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_validation_error() {
        let client = TmdbClient::new(&spawn_catalog().await).unwrap();
        let err = client.list(MovieList::Popular, 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_transport_error() {
        // Bind and drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = CatalogConfig {
            api_key: "secret".to_string(),
            base_url: format!("http://{}", addr),
            ..CatalogConfig::default()
        };
        let client = TmdbClient::new(&config).unwrap();
        let err = client.search(&Query::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
