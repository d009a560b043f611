use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("network not found: {0}")]
    NotFound(String),

    #[error("network already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<NetworkError> for ApiError {
    fn from(e: NetworkError) -> Self {
        match &e {
            NetworkError::InvalidArgument(m) => {
                ApiError::new(ErrorKind::InvalidArgument, m.clone())
            }
            NetworkError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m.clone()),
            NetworkError::AlreadyExists(_) => ApiError::new(ErrorKind::Conflict, e.to_string()),
            NetworkError::InvalidState(m) => ApiError::new(ErrorKind::InvalidState, m.clone()),
            _ => ApiError::new(ErrorKind::Internal, e.to_string()),
        }
    }
}
