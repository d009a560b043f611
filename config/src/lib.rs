//! Parsers turning CLI flag values into typed configuration pieces.
//!
//! Everything here is synchronous and, with one documented exception,
//! side-effect free: [`publish::parse_publish_socket`] prepares the host
//! socket path as part of parsing. Parsers fail fast; a request whose
//! flags do not parse never reaches the container service.

pub mod env;
pub mod error;
pub mod labels;
pub mod memory;
pub mod mount;
pub mod platform;
pub mod process;
pub mod publish;
pub mod resources;
pub mod user;

pub use env::merge_environment;
pub use error::ConfigError;
pub use labels::parse_labels;
pub use memory::{parse_memory_mib, tmpfs_size_bytes};
pub use mount::{
    parse_mount_directive, parse_tmpfs_list, parse_volume_spec, validate_mount, ParsedMount,
};
pub use platform::resolve_platform;
pub use process::{resolve_process, ImageDefaults};
pub use publish::{parse_publish_port, parse_publish_socket};
pub use resources::parse_resources;
pub use user::{default_user_for_image, resolve_user};
