use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::image::{DEFAULT_IMAGE_BASE_URL, DEFAULT_PLACEHOLDER};
use crate::catalog::ImageUrls;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// Directory with the browser UI's static files.
    #[serde(default)]
    pub appdir: Option<String>,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// May be given as `${ENV_VAR}`.
    #[serde(alias = "apikey")]
    pub api_key: String,
    #[serde(alias = "baseurl", default = "default_base_url")]
    pub base_url: String,
    #[serde(alias = "imagebaseurl", default = "default_image_base_url")]
    pub image_base_url: String,
    #[serde(alias = "placeholderimage", default = "default_placeholder")]
    pub placeholder_image: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(alias = "timeout", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            placeholder_image: default_placeholder(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CatalogConfig {
    pub fn image_urls(&self) -> ImageUrls {
        ImageUrls::new(&self.image_base_url, &self.placeholder_image)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(alias = "debounce", default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl QueryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(alias = "idletimeout", default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// New sessions are refused once this many are live.
    #[serde(alias = "maxactive", default = "default_max_active")]
    pub max_active: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            max_active: default_max_active(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    DEFAULT_IMAGE_BASE_URL.to_string()
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_max_active() -> usize {
    1000
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::ParseError(_, err) => ConfigError::ParseError(path.to_string(), err),
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::ParseError("<inline>".to_string(), e))?;

        config.catalog.api_key = expand_env(config.catalog.api_key.trim())?;
        if config.catalog.api_key.is_empty() {
            return Err(ConfigError::Invalid("catalog.api_key is required".to_string()));
        }
        if config.sessions.max_active == 0 {
            return Err(ConfigError::Invalid("sessions.max_active must be > 0".to_string()));
        }
        if config.catalog.timeout_secs == 0 {
            return Err(ConfigError::Invalid("catalog.timeout_secs must be > 0".to_string()));
        }

        Ok(config)
    }
}

/// Resolve a `${NAME}` value from the environment; anything else is literal.
fn expand_env(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(name) => {
            std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
        }
        None => Ok(value.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml("catalog:\n  api_key: abc123\n").unwrap();
        assert_eq!(config.listen.port, "8080");
        assert_eq!(config.catalog.base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.catalog.language, "en-US");
        assert_eq!(config.query.debounce(), Duration::from_millis(400));
        assert_eq!(config.sessions.idle_timeout_secs, 3600);
        assert_eq!(config.sessions.max_active, 1000);
        assert!(config.appdir.is_none());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
listen:
  address: 127.0.0.1
  port: "9000"
appdir: ./ui/build
catalog:
  apikey: abc123
  language: nl-NL
  timeout: 5
query:
  debounce: 300
sessions:
  idletimeout: 60
  maxactive: 5
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.address.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.appdir.as_deref(), Some("./ui/build"));
        assert_eq!(config.catalog.language, "nl-NL");
        assert_eq!(config.catalog.timeout_secs, 5);
        assert_eq!(config.query.debounce_ms, 300);
        assert_eq!(config.sessions.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.sessions.max_active, 5);
    }

    #[test]
    fn test_api_key_from_environment() {
        std::env::set_var("MOVIEDEX_TEST_TMDB_KEY", "from-env");
        let config = Config::from_yaml("catalog:\n  api_key: ${MOVIEDEX_TEST_TMDB_KEY}\n").unwrap();
        assert_eq!(config.catalog.api_key, "from-env");

        let err = Config::from_yaml("catalog:\n  api_key: ${MOVIEDEX_TEST_UNSET_KEY}\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref name) if name == "MOVIEDEX_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        assert!(matches!(
            Config::from_yaml("catalog:\n  api_key: \"\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(Config::from_yaml("listen: {}\n"), Err(ConfigError::ParseError(..))));
        assert!(matches!(
            Config::from_yaml("catalog:\n  api_key: k\nsessions:\n  max_active: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }
}
