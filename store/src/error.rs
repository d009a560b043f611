use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: String, computed: String },

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("layer extraction failed: {0}")]
    Extraction(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
