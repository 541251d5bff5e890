use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::catalog::{
    FetchError, Genre, Movie, MovieDetails, MovieId, MovieList, MoviePage, TrendingWindow,
};
use crate::favorites::FavoritesSet;
use crate::query::{FilterChange, QueryError, QuerySnapshot, ValidationError, MAX_PAGE};
use crate::server::AppState;
use crate::session::{Session, SessionError};

use super::types::*;

/// Error reply with a JSON body the UI can show as a notification.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unknown_session(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Unknown session: {}", id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.body_text())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::PageOutOfRange { .. } => Self::new(StatusCode::CONFLICT, e.to_string()),
            QueryError::Closed => Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        if e.is_not_found() {
            return Self::new(StatusCode::NOT_FOUND, e.to_string());
        }
        warn!("Catalog request failed: {}", e);
        Self::new(StatusCode::BAD_GATEWAY, e.to_string())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn session(state: &AppState, id: &str) -> Result<Arc<Session>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::unknown_session(id))
}

async fn favorites_of(state: &AppState, session_id: Option<&str>) -> Option<FavoritesSet> {
    let session = state.sessions.get(session_id?).await?;
    let favorites = session.favorites.read().await;
    Some(favorites.clone())
}

fn movie_view(state: &AppState, movie: Movie, favorites: Option<&FavoritesSet>) -> MovieView {
    MovieView {
        year: movie.release_year(),
        poster_url: state.images.poster(movie.poster_path.as_deref()),
        backdrop_url: state.images.backdrop(movie.backdrop_path.as_deref()),
        genres: state.genres.names(&movie.genre_ids),
        is_favorite: favorites.map(|f| f.is_favorite(movie.id)).unwrap_or(false),
        movie,
    }
}

fn page_view(state: &AppState, page: MoviePage, favorites: Option<&FavoritesSet>) -> MoviePageView {
    MoviePageView {
        page: page.page,
        total_pages: page.total_pages,
        total_results: page.total_results,
        movies: page
            .movies
            .into_iter()
            .map(|m| movie_view(state, m, favorites))
            .collect(),
    }
}

async fn listing_view(state: &AppState, session: &Session, snap: &QuerySnapshot) -> ListingView {
    let favorites = session.favorites.read().await;
    ListingView {
        query: snap.query.clone(),
        search_input: snap.search_input.clone(),
        search_pending: snap.search_pending,
        load: snap.load.clone(),
        stale: snap.stale,
        movies: snap
            .movies
            .iter()
            .cloned()
            .map(|m| movie_view(state, m, Some(&*favorites)))
            .collect(),
        page: snap.page,
        total_pages: snap.total_pages,
        total_results: snap.total_results,
        pages: snap.pages.clone(),
    }
}

async fn current_listing(state: &AppState, session: &Session) -> Json<ListingView> {
    let snap = session.query.snapshot();
    Json(listing_view(state, session, &snap).await)
}

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let session = state.sessions.create().await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            id: session.id.clone(),
        }),
    ))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::unknown_session(&id))
    }
}

pub async fn get_movies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn set_search(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    let Json(body) = body?;
    session.query.set_search_term(body.term).await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn set_filter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FilterBody>, JsonRejection>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    let Json(body) = body?;
    let change = FilterChange::parse(&body.field, &body.value_str())?;
    debug!(session = %id, ?change, "filter change");
    session.query.set_filter(change).await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn reset_filters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    session.query.reset_filters().await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn set_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PageBody>, JsonRejection>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    let Json(body) = body?;
    session.query.set_page(body.page).await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn next_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    session.query.next_page().await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn previous_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    session.query.previous_page().await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn refresh(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ListingView> {
    let session = session(&state, &id).await?;
    session.query.refresh().await?;
    Ok(current_listing(&state, &session).await)
}

pub async fn get_favorites(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<MovieView>> {
    let session = session(&state, &id).await?;
    let favorites = session.favorites.read().await;
    let views = favorites
        .list()
        .into_iter()
        .map(|m| movie_view(&state, m, Some(&*favorites)))
        .collect();
    Ok(Json(views))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ToggleBody>, JsonRejection>,
) -> ApiResult<ToggleResult> {
    let session = session(&state, &id).await?;
    let Json(body) = body?;
    let movie_id = body.id();

    let movie = match body {
        ToggleBody::Movie(movie) => movie,
        ToggleBody::Id { id: movie_id } => resolve_movie(&state, &session, movie_id).await?,
    };

    let favorite = session.favorites.write().await.toggle(movie);
    debug!(session = %id, movie = %movie_id, favorite, "toggled favorite");
    Ok(Json(ToggleResult {
        id: movie_id,
        favorite,
    }))
}

/// Find a movie by id in what the session already holds, falling back to the
/// catalog.
async fn resolve_movie(
    state: &AppState,
    session: &Session,
    id: MovieId,
) -> Result<Movie, ApiError> {
    if let Some(m) = session.favorites.read().await.list().into_iter().find(|m| m.id == id) {
        return Ok(m);
    }
    if let Some(m) = session.query.snapshot().movies.iter().find(|m| m.id == id) {
        return Ok(m.clone());
    }
    let details = state.catalog.movie_details(id).await?;
    Ok(details.movie)
}

pub async fn get_genres(State(state): State<AppState>) -> ApiResult<Vec<Genre>> {
    if state.genres.is_empty() {
        state.genres.refresh(state.catalog.as_ref()).await?;
    }
    Ok(Json(state.genres.get().as_ref().clone()))
}

pub async fn get_movie(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<MovieDetailsView> {
    let Path(id) = id?;
    let Query(params) = params?;
    let details: MovieDetails = state.catalog.movie_details(MovieId(id)).await?;
    let favorites = favorites_of(&state, params.session.as_deref()).await;

    Ok(Json(MovieDetailsView {
        year: details.movie.release_year(),
        poster_url: state.images.poster(details.movie.poster_path.as_deref()),
        backdrop_url: state.images.backdrop(details.movie.backdrop_path.as_deref()),
        runtime_text: details.runtime.map(format_runtime),
        is_favorite: favorites
            .map(|f| f.is_favorite(details.movie.id))
            .unwrap_or(false),
        details,
    }))
}

/// `?page=` on the stateless catalog routes. Out of range is bad input here,
/// not a conflict with listing state.
fn page_param(params: &ListParams) -> Result<u32, ApiError> {
    let page = params.page.unwrap_or(1);
    if page == 0 || page > MAX_PAGE {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid page: {} (1..={})", page, MAX_PAGE),
        ));
    }
    Ok(page)
}

pub async fn get_list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<MoviePageView> {
    let Query(params) = params?;
    let list = MovieList::from_str(&name)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Unknown list: {}", name)))?;
    let page = state.catalog.list(list, page_param(&params)?).await?;
    let favorites = favorites_of(&state, params.session.as_deref()).await;
    Ok(Json(page_view(&state, page, favorites.as_ref())))
}

pub async fn get_trending(
    State(state): State<AppState>,
    Path(window): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<MoviePageView> {
    let Query(params) = params?;
    let window = TrendingWindow::from_str(&window).ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, format!("Unknown trending window: {}", window))
    })?;
    let page = state.catalog.trending(window, page_param(&params)?).await?;
    let favorites = favorites_of(&state, params.session.as_deref()).await;
    Ok(Json(page_view(&state, page, favorites.as_ref())))
}
