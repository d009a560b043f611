use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidArgument(m) => ApiError::new(ErrorKind::InvalidArgument, m),
            ConfigError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m),
            ConfigError::Conflict(m) => ApiError::new(ErrorKind::Conflict, m),
            ConfigError::Io(e) => ApiError::new(ErrorKind::Internal, e.to_string()),
        }
    }
}
