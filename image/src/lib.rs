//! Image service: pulls images for a platform with per-layer progress and
//! materialises their root filesystems in the store.

mod error;
mod service;

pub use error::ImageError;
pub use service::{ImageService, PulledImage};
