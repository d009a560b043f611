use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("invalid volume name: {0}")]
    InvalidName(String),

    #[error("volume not found: {0}")]
    NotFound(String),

    #[error("volume already exists: {0}")]
    AlreadyExists(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<VolumeError> for ApiError {
    fn from(e: VolumeError) -> Self {
        match &e {
            VolumeError::InvalidName(_) => {
                ApiError::new(ErrorKind::InvalidArgument, e.to_string())
            }
            VolumeError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m.clone()),
            VolumeError::AlreadyExists(_) => ApiError::new(ErrorKind::Conflict, e.to_string()),
            _ => ApiError::new(ErrorKind::Internal, e.to_string()),
        }
    }
}
