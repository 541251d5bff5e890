/// Every way a catalog call can fail. The message is what the UI shows.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Catalog service error ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("Unexpected catalog response: {0}")]
    Validation(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Service { status: 404, .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return FetchError::Validation(e.to_string());
        }
        if e.is_timeout() {
            return FetchError::Transport("request timed out".to_string());
        }
        FetchError::Transport(e.to_string())
    }
}
