pub mod api;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod middleware;
pub mod query;
pub mod server;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

const SESSION_SWEEP_SECS: u64 = 60;
const GENRE_REFRESH_SECS: u64 = 6 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::FetchError),
    #[error("Server error: {0}")]
    Server(String),
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), AppError> {
    let config = config::Config::from_file(config_path)?;

    info!("Using config file: {}", config_path);
    info!("Catalog: {} ({})", config.catalog.base_url, config.catalog.language);
    if debug_logs {
        info!("Debug logging enabled");
    }

    let catalog: Arc<dyn catalog::Catalog> = Arc::new(catalog::TmdbClient::new(&config.catalog)?);

    let genres = Arc::new(catalog::GenreCache::new());
    match genres.refresh(catalog.as_ref()).await {
        Ok(count) => info!("Loaded {} genres", count),
        Err(e) => warn!("Could not load genre list, will retry: {}", e),
    }
    genres.clone().start_background_refresh(catalog.clone(), GENRE_REFRESH_SECS);

    let sessions = Arc::new(session::SessionRepo::new(
        catalog.clone(),
        config.query.debounce(),
        config.sessions.idle_timeout(),
        config.sessions.max_active,
    ));
    sessions.clone().start_background_expiry(SESSION_SWEEP_SECS);

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| AppError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = server::AppState::new(config, catalog, sessions, genres);
    let app = server::build_router(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| AppError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .map_err(|e| AppError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| AppError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}
