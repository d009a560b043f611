//! Content-addressed storage for image blobs and manifests, plus the
//! unpacked root filesystems built from them.

mod error;
mod storage;
mod unpack;

pub use error::StoreError;
pub use storage::{Digest, ImageStore};
pub use unpack::extract_layer;
