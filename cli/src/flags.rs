//! Flag groups shared by `run` and `create`, mirroring the wire option
//! structs the daemon's pipeline consumes.

use berth_core::api::{
    CreateContainerRequest, ManagementOptions, ProcessOptions, RegistryOptions, RegistryScheme,
    ResourceOptions,
};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProcessFlags {
    /// Set environment variables (KEY[=VALUE]; a bare KEY copies the
    /// daemon's value)
    #[arg(long = "env", short = 'e')]
    pub env: Vec<String>,

    /// Read environment variables from a file
    #[arg(long = "env-file")]
    pub env_file: Vec<PathBuf>,

    /// Working directory inside the container
    #[arg(long, short = 'w')]
    pub cwd: Option<String>,

    /// Allocate a pseudo-TTY
    #[arg(long, short = 't')]
    pub tty: bool,

    /// User to run as (name or uid[:gid])
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Numeric user id
    #[arg(long)]
    pub uid: Option<u32>,

    /// Numeric group id
    #[arg(long)]
    pub gid: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ManagementFlags {
    /// Override the image entrypoint
    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Target operating system
    #[arg(long)]
    pub os: Option<String>,

    /// Target architecture
    #[arg(long, short = 'a')]
    pub arch: Option<String>,

    /// Target platform as OS/ARCH[/VARIANT]; wins over --os/--arch
    #[arg(long)]
    pub platform: Option<String>,

    /// Bind or named-volume mount (SRC:DST[:OPTS])
    #[arg(long = "volume", short = 'v')]
    pub volumes: Vec<String>,

    /// Mount directive (type=...,source=...,destination=...[,ro])
    #[arg(long = "mount")]
    pub mounts: Vec<String>,

    /// Tmpfs mount at the given destination
    #[arg(long = "tmpfs")]
    pub tmpfs: Vec<String>,

    /// Attach a label (KEY[=VALUE])
    #[arg(long = "label", short = 'l')]
    pub labels: Vec<String>,

    /// Attach to a network
    #[arg(long = "network")]
    pub networks: Vec<String>,

    /// Disable DNS configuration in the guest
    #[arg(long)]
    pub dns_disabled: bool,

    /// DNS nameserver
    #[arg(long = "dns-nameserver")]
    pub dns_nameservers: Vec<String>,

    /// DNS search domain
    #[arg(long = "dns-search")]
    pub dns_search: Vec<String>,

    /// DNS option
    #[arg(long = "dns-option")]
    pub dns_options: Vec<String>,

    /// DNS default domain
    #[arg(long = "dns-domain")]
    pub dns_domain: Option<String>,

    /// Publish a port ([HOST-IP:]HOST:CONTAINER[/PROTO])
    #[arg(long = "publish-port", short = 'p')]
    pub publish_ports: Vec<String>,

    /// Publish a socket (HOST_PATH:CONTAINER_PATH)
    #[arg(long = "publish-socket")]
    pub publish_sockets: Vec<String>,

    /// Boot with this kernel instead of the default
    #[arg(long)]
    pub kernel: Option<PathBuf>,

    /// Enable SSH passthrough
    #[arg(long)]
    pub ssh: bool,

    /// Expose nested virtualization to the guest
    #[arg(long)]
    pub virtualization: bool,
}

#[derive(Args, Debug)]
pub struct ResourceFlags {
    /// Number of CPUs
    #[arg(long, short = 'c')]
    pub cpus: Option<u32>,

    /// Memory size (e.g. 1g, 512m)
    #[arg(long, short = 'm')]
    pub memory: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegistryFlags {
    /// Registry scheme: auto, http, or https
    #[arg(long, default_value = "auto")]
    pub scheme: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image reference to run
    pub image: String,

    /// Container id (generated when omitted)
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub process: ProcessFlags,

    #[command(flatten)]
    pub management: ManagementFlags,

    #[command(flatten)]
    pub resources: ResourceFlags,

    #[command(flatten)]
    pub registry: RegistryFlags,

    /// Command and arguments for the container process
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub arguments: Vec<String>,
}

impl RunArgs {
    pub fn into_request(self) -> Result<CreateContainerRequest, String> {
        let scheme: RegistryScheme = self.registry.scheme.parse()?;
        Ok(CreateContainerRequest {
            id: self.name,
            image: self.image,
            arguments: self.arguments,
            process: ProcessOptions {
                env: self.process.env,
                env_files: self.process.env_file,
                cwd: self.process.cwd,
                tty: self.process.tty,
                user: self.process.user,
                uid: self.process.uid,
                gid: self.process.gid,
            },
            management: ManagementOptions {
                entrypoint: self.management.entrypoint,
                os: self.management.os,
                arch: self.management.arch,
                platform: self.management.platform,
                volumes: self.management.volumes,
                mounts: self.management.mounts,
                tmpfs: self.management.tmpfs,
                labels: self.management.labels,
                networks: self.management.networks,
                dns_disabled: self.management.dns_disabled,
                dns_nameservers: self.management.dns_nameservers,
                dns_search: self.management.dns_search,
                dns_options: self.management.dns_options,
                dns_domain: self.management.dns_domain,
                publish_ports: self.management.publish_ports,
                publish_sockets: self.management.publish_sockets,
                kernel: self.management.kernel,
                ssh: self.management.ssh,
                virtualization: self.management.virtualization,
            },
            resources: ResourceOptions {
                cpus: self.resources.cpus,
                memory: self.resources.memory,
            },
            registry: RegistryOptions { scheme },
        })
    }
}
