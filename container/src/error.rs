use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Config(#[from] berth_config::ConfigError),

    #[error(transparent)]
    Image(#[from] berth_image::ImageError),

    #[error(transparent)]
    Registry(#[from] berth_remote::RegistryError),

    #[error(transparent)]
    Kernel(#[from] berth_kernel::KernelError),

    #[error(transparent)]
    Network(#[from] berth_network::NetworkError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ContainerError> for ApiError {
    fn from(e: ContainerError) -> Self {
        match e {
            ContainerError::InvalidArgument(m) => ApiError::new(ErrorKind::InvalidArgument, m),
            ContainerError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m),
            ContainerError::AlreadyExists(m) => ApiError::new(ErrorKind::Conflict, m),
            ContainerError::InvalidState(m) => ApiError::new(ErrorKind::InvalidState, m),
            ContainerError::Config(e) => e.into(),
            ContainerError::Image(e) => e.into(),
            ContainerError::Kernel(e) => e.into(),
            ContainerError::Network(e) => e.into(),
            ContainerError::Registry(e) => match e {
                berth_remote::RegistryError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m),
                berth_remote::RegistryError::InvalidReference(m) => {
                    ApiError::new(ErrorKind::InvalidArgument, m)
                }
                other => ApiError::new(ErrorKind::Internal, other.to_string()),
            },
            other => ApiError::new(ErrorKind::Internal, other.to_string()),
        }
    }
}
