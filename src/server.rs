use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::catalog::{Catalog, GenreCache, ImageUrls};
use crate::config::Config;
use crate::session::SessionRepo;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn Catalog>,
    pub sessions: Arc<SessionRepo>,
    pub genres: Arc<GenreCache>,
    pub images: Arc<ImageUrls>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn Catalog>,
        sessions: Arc<SessionRepo>,
        genres: Arc<GenreCache>,
    ) -> Self {
        let images = Arc::new(config.catalog.image_urls());
        Self {
            config: Arc::new(config),
            catalog,
            sessions,
            genres,
            images,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/api/sessions", post(crate::api::create_session))
        .route(
            "/api/sessions/:id",
            axum::routing::delete(crate::api::delete_session),
        )
        .route("/api/sessions/:id/movies", get(crate::api::get_movies))
        .route("/api/sessions/:id/search", put(crate::api::set_search))
        .route(
            "/api/sessions/:id/filters",
            put(crate::api::set_filter).delete(crate::api::reset_filters),
        )
        .route("/api/sessions/:id/page", put(crate::api::set_page))
        .route("/api/sessions/:id/page/next", post(crate::api::next_page))
        .route(
            "/api/sessions/:id/page/previous",
            post(crate::api::previous_page),
        )
        .route("/api/sessions/:id/refresh", post(crate::api::refresh))
        .route(
            "/api/sessions/:id/favorites",
            get(crate::api::get_favorites).post(crate::api::toggle_favorite),
        );

    let catalog_routes = Router::new()
        .route("/api/genres", get(crate::api::get_genres))
        .route("/api/movies/:id", get(crate::api::get_movie))
        .route("/api/lists/:list", get(crate::api::get_list))
        .route("/api/trending/:window", get(crate::api::get_trending));

    let mut router = Router::new()
        .route("/robots.txt", get(robots_txt_handler))
        .merge(session_routes)
        .merge(catalog_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(axum::middleware::from_fn(crate::middleware::no_store_api))
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /api/\n"
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
