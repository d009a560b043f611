//! Application data root resolution.
//!
//! All persisted daemon state (kernels, networks, volumes, containers,
//! image content) lives under a single directory, relocatable with the
//! `BERTH_APP_ROOT` environment variable.

use std::path::PathBuf;

pub const APP_ROOT_ENV: &str = "BERTH_APP_ROOT";

/// Resolves the application data root: the environment override if set,
/// else the per-user application-support location.
pub fn app_root() -> PathBuf {
    if let Ok(root) = std::env::var(APP_ROOT_ENV) {
        if !root.is_empty() {
            return PathBuf::from(root);
        }
    }
    default_app_root()
}

fn default_app_root() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let home = PathBuf::from(home);
        if cfg!(target_os = "macos") {
            home.join("Library/Application Support/com.berth.berth")
        } else {
            home.join(".local/share/berth")
        }
    } else {
        PathBuf::from("/tmp/berth")
    }
}

/// Path of the daemon's API socket under the given root.
pub fn api_socket_path(root: &std::path::Path) -> PathBuf {
    root.join("berth-api.sock")
}
