use serde::{Deserialize, Serialize};

/// Stable identifiers for every RPC entry point the daemon exposes.
///
/// The route table built at bootstrap maps each of these to a handler;
/// unknown routes are rejected before any payload is examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    // Containers
    ContainerList,
    ContainerCreate,
    ContainerDelete,
    ContainerLogs,
    ContainerBootstrap,
    ContainerDial,
    ContainerStop,
    ContainerStartProcess,
    ContainerCreateProcess,
    ContainerResize,
    ContainerWait,
    ContainerKill,

    // Networks
    NetworkCreate,
    NetworkDelete,
    NetworkList,

    // Volumes
    VolumeCreate,
    VolumeDelete,
    VolumeList,
    VolumeInspect,

    // Kernel
    InstallKernel,
    GetDefaultKernel,

    // Plugins
    PluginGet,
    PluginList,
    PluginLoad,
    PluginUnload,
    PluginRestart,

    // Health
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_serializes_camel_case() {
        let json = serde_json::to_string(&Route::ContainerStartProcess).unwrap();
        assert_eq!(json, "\"containerStartProcess\"");
    }

    #[test]
    fn test_route_round_trips() {
        for route in [Route::Ping, Route::VolumeInspect, Route::GetDefaultKernel] {
            let json = serde_json::to_string(&route).unwrap();
            let back: Route = serde_json::from_str(&json).unwrap();
            assert_eq!(back, route);
        }
    }
}
