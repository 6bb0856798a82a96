use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-success reply from the provider. `message` holds the raw body so
    /// hints embedded in it (such as `retryDelay`) survive.
    #[error("[{status}] {message}")]
    Status { status: u16, message: String },
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed stream payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("provider: {0}")]
    Provider(String),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Status { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
