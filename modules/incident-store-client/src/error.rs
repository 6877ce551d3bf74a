use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Draft rejected: {0}")]
    Validation(String),

    #[error("Incident not found: {0}")]
    NotFound(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    /// Failures reaching or talking to the store, as opposed to the store
    /// answering "no" about a specific draft or incident.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::Parse(_) | StoreError::Api { .. }
        )
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Parse(err.to_string())
    }
}
