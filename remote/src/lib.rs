//! Thin OCI registry client: reference parsing, manifest resolution for a
//! platform, blob download. Everything heavier (caching, unpacking) lives
//! in `berth-store` and `berth-image`.

mod client;
mod error;
mod reference;
mod types;

pub use client::RegistryClient;
pub use error::RegistryError;
pub use reference::ImageReference;
pub use types::*;
