use berth_core::{ApiError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("plugin not loaded: {0}")]
    NotLoaded(String),

    #[error("failed to launch plugin {name}: {reason}")]
    Launch { name: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PluginError> for ApiError {
    fn from(e: PluginError) -> Self {
        match &e {
            PluginError::NotFound(m) => ApiError::new(ErrorKind::NotFound, m.clone()),
            PluginError::NotLoaded(m) => ApiError::new(ErrorKind::InvalidState, m.clone()),
            _ => ApiError::new(ErrorKind::Internal, e.to_string()),
        }
    }
}
