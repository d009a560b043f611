//! Kernel management: installed kernel files under `<app_root>/kernels/`
//! with a `default.kernel-<arch>` symlink per architecture.

mod error;
mod extract;
mod service;

pub use error::KernelError;
pub use extract::normalize_archive_path;
pub use service::KernelService;
