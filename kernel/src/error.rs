use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("kernel not found: {0}")]
    NotFound(String),

    #[error("kernel already installed: {0} (use force to replace)")]
    AlreadyInstalled(String),

    #[error("archive entry not found: {0}")]
    EntryNotFound(String),

    #[error("archive extraction failed: {0}")]
    Extraction(String),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KernelError> for ApiError {
    fn from(e: KernelError) -> Self {
        match &e {
            KernelError::InvalidArgument(m) => ApiError::new(ErrorKind::InvalidArgument, m.clone()),
            KernelError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m.clone()),
            KernelError::EntryNotFound(m) => ApiError::new(ErrorKind::NotFound, m.clone()),
            KernelError::AlreadyInstalled(_) => ApiError::new(ErrorKind::Conflict, e.to_string()),
            _ => ApiError::new(ErrorKind::Internal, e.to_string()),
        }
    }
}
