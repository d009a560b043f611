use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Registry(#[from] berth_remote::RegistryError),

    #[error(transparent)]
    Store(#[from] berth_store::StoreError),

    #[error("image not found: {0}")]
    NotFound(String),

    #[error("invalid image config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match &e {
            ImageError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m.clone()),
            ImageError::Registry(berth_remote::RegistryError::NotFound(m)) => {
                ApiError::new(ErrorKind::NotFound, m.clone())
            }
            ImageError::Registry(berth_remote::RegistryError::InvalidReference(m)) => {
                ApiError::new(ErrorKind::InvalidArgument, m.clone())
            }
            _ => ApiError::new(ErrorKind::Internal, e.to_string()),
        }
    }
}
