use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("not authorised (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lookup query must be at least {min} characters")]
    QueryTooShort { min: usize },
}
