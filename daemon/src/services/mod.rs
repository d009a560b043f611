//! Route harnesses: one file per service, translating wire payloads into
//! service calls and service errors into `ApiError`s.

mod container;
mod health;
mod kernel;
mod network;
mod plugin;
mod volume;

pub use container::register_containers;
pub use health::register_health;
pub use kernel::register_kernel;
pub use network::register_networks;
pub use plugin::register_plugins;
pub use volume::register_volumes;
