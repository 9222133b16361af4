use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// The caller's abort signal fired. Never surfaced to users.
    #[error("request aborted")]
    Aborted,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{error_type}: {message}")]
    Backend { error_type: String, message: String },

    #[error("kube proxy error: {0}")]
    Kube(#[from] kube::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl MetricsError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<reqwest::Error> for MetricsError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}
