//! Request and response payloads for each route.
//!
//! The create request carries the raw flag groups of the client; the
//! daemon-side configuration pipeline turns them into a validated
//! [`crate::ContainerConfiguration`].

use crate::types::{
    Attachment, ContainerConfiguration, ContainerStatus, Kernel, ProcessConfiguration,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Flags describing the container process (`--env`, `--cwd`, `--tty`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub env_files: Vec<PathBuf>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tty: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub uid: Option<u32>,
    #[serde(default)]
    pub gid: Option<u32>,
}

/// Flags describing how the container is assembled and attached
/// (`--mount`, `--network`, `--publish-port`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagementOptions {
    #[serde(default)]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub tmpfs: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub dns_disabled: bool,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
    #[serde(default)]
    pub dns_search: Vec<String>,
    #[serde(default)]
    pub dns_options: Vec<String>,
    #[serde(default)]
    pub dns_domain: Option<String>,
    #[serde(default)]
    pub publish_ports: Vec<String>,
    #[serde(default)]
    pub publish_sockets: Vec<String>,
    #[serde(default)]
    pub kernel: Option<PathBuf>,
    #[serde(default)]
    pub ssh: bool,
    #[serde(default)]
    pub virtualization: bool,
}

/// Flags sizing the container VM (`--cpus`, `--memory`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceOptions {
    #[serde(default)]
    pub cpus: Option<u32>,
    #[serde(default)]
    pub memory: Option<String>,
}

/// How registries are reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryScheme {
    #[default]
    Auto,
    Http,
    Https,
}

impl std::str::FromStr for RegistryScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("invalid registry scheme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryOptions {
    #[serde(default)]
    pub scheme: RegistryScheme,
}

// Containers

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    /// Explicit container id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub image: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub process: ProcessOptions,
    #[serde(default)]
    pub management: ManagementOptions,
    #[serde(default)]
    pub resources: ResourceOptions,
    #[serde(default)]
    pub registry: RegistryOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContainerResponse {
    pub id: String,
    pub configuration: ContainerConfiguration,
    pub kernel: Kernel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: String,
    pub image: String,
    pub status: ContainerStatus,
    pub networks: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListContainersResponse {
    pub containers: Vec<ContainerSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerIdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteContainerRequest {
    pub id: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsRequest {
    pub id: String,
    /// Limit output to the last N lines.
    #[serde(default)]
    pub tail: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialRequest {
    pub id: String,
    pub port: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialResponse {
    /// Host Unix socket bridged to the requested guest port.
    pub socket_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopContainerRequest {
    pub id: String,
    #[serde(default)]
    pub timeout_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartProcessRequest {
    pub id: String,
    pub process_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProcessRequest {
    pub id: String,
    pub process_id: String,
    pub process: ProcessConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub id: String,
    #[serde(default)]
    pub process_id: Option<String>,
    pub columns: u16,
    pub rows: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitRequest {
    pub id: String,
    #[serde(default)]
    pub process_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitResponse {
    pub exit_code: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillRequest {
    pub id: String,
    pub signal: String,
}

// Networks

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Nat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Created,
    Running,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkCreateRequest {
    pub id: String,
    #[serde(default = "default_network_mode")]
    pub mode: NetworkMode,
}

fn default_network_mode() -> NetworkMode {
    NetworkMode::Nat
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub id: String,
    pub mode: NetworkMode,
    pub state: NetworkState,
    pub subnet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkListResponse {
    pub networks: Vec<NetworkStatus>,
}

// Volumes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeCreateRequest {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub name: String,
    pub source: PathBuf,
    pub created_at: u64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeListResponse {
    pub volumes: Vec<VolumeInfo>,
}

// Kernel

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallKernelRequest {
    /// Local file path, or a URL / path of a tar archive when `tar_entry`
    /// is set.
    pub source: String,
    /// Path of the kernel file inside the archive.
    #[serde(default)]
    pub tar_entry: Option<String>,
    /// Target architecture; defaults to the host architecture.
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDefaultKernelRequest {
    pub architecture: String,
}

// Plugins

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub binary: PathBuf,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub author: String,
    pub services: Vec<String>,
    pub should_boot: bool,
    pub loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginListResponse {
    pub plugins: Vec<PluginInfo>,
}

// Health

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub version: String,
}

/// Routes that carry no meaningful payload use this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}
