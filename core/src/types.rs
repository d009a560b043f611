//! Domain types describing a container and the pieces it is assembled from.
//!
//! These are plain serde values. Parsing user input into them is the job of
//! `berth-config`; resolving them against live services is the job of the
//! configuration pipeline in `berth-container`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// OS / architecture pair a container is built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    pub fn new(os: &str, architecture: &str) -> Self {
        Self {
            os: os.to_string(),
            architecture: architecture.to_string(),
            variant: None,
        }
    }

    /// The container platform native to this machine: linux on the host
    /// architecture.
    pub fn host() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            a => a,
        };
        Self::new("linux", arch)
    }

    /// Architecture of the host CPU, in OCI spelling.
    pub fn host_architecture() -> &'static str {
        match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            a => a,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variant {
            Some(v) => write!(f, "{}/{}/{}", self.os, self.architecture, v),
            None => write!(f, "{}/{}", self.os, self.architecture),
        }
    }
}

/// The identity a container process runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContainerUser {
    /// An unresolved user string, resolved inside the guest (`"nobody"`,
    /// `"1000:1000"`, ...).
    Raw { value: String },
    /// Explicit numeric ids.
    Id { uid: u32, gid: u32 },
}

impl ContainerUser {
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw {
            value: value.into(),
        }
    }

    pub fn id(uid: u32, gid: u32) -> Self {
        Self::Id { uid, gid }
    }
}

/// Fully resolved process launch description.
///
/// `executable` is always the first element of `arguments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfiguration {
    pub executable: String,
    pub arguments: Vec<String>,
    pub environment: Vec<String>,
    pub working_directory: String,
    pub terminal: bool,
    pub user: ContainerUser,
    pub supplemental_groups: Vec<u32>,
}

/// How a mount's guest-visible directory is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Virtiofs,
    Tmpfs,
    Volume,
}

/// A guest filesystem mount.
///
/// For `tmpfs` the source is empty; for `volume` the source holds the
/// resolved host directory of the named volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    #[serde(rename = "type")]
    pub mount_type: MountType,
    pub source: String,
    pub destination: String,
    pub options: Vec<String>,
}

impl Mount {
    pub fn tmpfs(destination: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            mount_type: MountType::Tmpfs,
            source: String::new(),
            destination: destination.into(),
            options,
        }
    }

    pub fn virtiofs(
        source: impl Into<String>,
        destination: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self {
            mount_type: MountType::Virtiofs,
            source: source.into(),
            destination: destination.into(),
            options,
        }
    }

    pub fn readonly(&self) -> bool {
        self.options.iter().any(|o| o == "ro")
    }
}

/// A named-volume reference produced by the mount parser, resolved against
/// the volume service before it becomes a [`Mount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedVolume {
    pub name: String,
    pub destination: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl std::str::FromStr for PortProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(format!("invalid protocol: {other}")),
        }
    }
}

/// A container port exposed on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPort {
    pub host_address: String,
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: PortProtocol,
}

/// A container Unix socket exposed on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishSocket {
    pub host_path: PathBuf,
    pub container_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<u32>,
}

/// A container's membership in one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub network: String,
    pub hostname: String,
}

/// Guest resolver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsConfiguration {
    pub nameservers: Vec<String>,
    pub search_domains: Vec<String>,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// CPU and memory granted to the container VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub cpus: u32,
    pub memory_bytes: u64,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cpus: 4,
            memory_bytes: 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualizationOptions {
    /// Expose nested virtualization to the guest.
    pub nested: bool,
}

/// The image a container was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Reference as the user supplied it.
    pub reference: String,
    /// Digest of the resolved manifest.
    pub digest: String,
}

/// A bootable kernel on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kernel {
    pub path: PathBuf,
    pub platform: Platform,
}

/// The complete, validated description of a container, sufficient to boot
/// it. Immutable once produced by the configuration pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfiguration {
    pub id: String,
    pub image: ImageDescriptor,
    pub process: ProcessConfiguration,
    pub resources: Resources,
    pub platform: Platform,
    /// Unpacked root filesystem of the container image.
    pub rootfs: PathBuf,
    /// Unpacked root filesystem of the init image, always host-platform.
    pub initfs: PathBuf,
    pub mounts: Vec<Mount>,
    pub networks: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfiguration>,
    pub labels: HashMap<String, String>,
    pub published_ports: Vec<PublishPort>,
    pub published_sockets: Vec<PublishSocket>,
    pub ssh: bool,
    /// Run amd64 binaries under emulation on an arm64 host.
    pub rosetta: bool,
    pub virtualization: VirtualizationOptions,
}

impl ContainerConfiguration {
    /// Checks the structural invariants every produced configuration must
    /// hold. The pipeline calls this last, after all stages succeed.
    pub fn validate(&self) -> Result<(), String> {
        if self.process.executable.is_empty() {
            return Err("process executable is empty".to_string());
        }
        for mount in &self.mounts {
            if mount.destination.is_empty() {
                return Err("mount destination is empty".to_string());
            }
            if !mount.destination.starts_with('/') {
                return Err(format!(
                    "mount destination is not absolute: {}",
                    mount.destination
                ));
            }
        }
        for key in self.labels.keys() {
            if key.is_empty() {
                return Err("label key is empty".to_string());
            }
        }
        for socket in &self.published_sockets {
            if !socket.container_path.starts_with('/') {
                return Err(format!(
                    "published socket container path is not absolute: {}",
                    socket.container_path
                ));
            }
        }
        Ok(())
    }
}

/// Lifecycle state of a managed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Stopped,
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> ContainerConfiguration {
        ContainerConfiguration {
            id: "c1".to_string(),
            image: ImageDescriptor {
                reference: "alpine:latest".to_string(),
                digest: "sha256:abc".to_string(),
            },
            process: ProcessConfiguration {
                executable: "/bin/sh".to_string(),
                arguments: vec!["/bin/sh".to_string()],
                environment: vec![],
                working_directory: "/".to_string(),
                terminal: false,
                user: ContainerUser::id(0, 0),
                supplemental_groups: vec![],
            },
            resources: Resources::default(),
            platform: Platform::new("linux", "arm64"),
            rootfs: PathBuf::from("/tmp/rootfs"),
            initfs: PathBuf::from("/tmp/initfs"),
            mounts: vec![],
            networks: vec![],
            dns: None,
            labels: HashMap::new(),
            published_ports: vec![],
            published_sockets: vec![],
            ssh: false,
            rosetta: false,
            virtualization: VirtualizationOptions::default(),
        }
    }

    #[test]
    fn test_validate_accepts_minimal_config() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_executable() {
        let mut config = minimal_config();
        config.process.executable.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_mount_destination() {
        let mut config = minimal_config();
        config.mounts.push(Mount::tmpfs("tmp", vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_label_key() {
        let mut config = minimal_config();
        config.labels.insert(String::new(), "v".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::new("linux", "arm64").to_string(), "linux/arm64");
        let mut p = Platform::new("linux", "arm64");
        p.variant = Some("v8".to_string());
        assert_eq!(p.to_string(), "linux/arm64/v8");
    }
}
