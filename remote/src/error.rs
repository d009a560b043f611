use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    #[error("image not found: {0}")]
    NotFound(String),

    #[error("no manifest for platform {0}")]
    NoMatchingPlatform(String),

    #[error("registry auth failed: {0}")]
    Auth(String),

    #[error("unexpected registry response: {status} for {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
