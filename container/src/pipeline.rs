//! The configuration assembly pipeline.
//!
//! Turns a create request (image reference, positional arguments, flag
//! groups) into a validated `ContainerConfiguration` and a bootable
//! kernel. Image pull/unpack, kernel acquisition, and the init image
//! pull/unpack run concurrently; the first failure cancels the rest.

use crate::error::ContainerError;
use berth_config as config;
use berth_core::api::CreateContainerRequest;
use berth_core::{
    Attachment, ContainerConfiguration, DnsConfiguration, ImageDescriptor, Kernel, Mount,
    MountType, ParsedVolume, Platform, ProgressSink, VirtualizationOptions,
};
use berth_image::ImageService;
use berth_kernel::KernelService;
use berth_network::{NetworkService, DEFAULT_NETWORK_ID};
use berth_progress::ProgressCoordinator;
use berth_remote::{ImageReference, RegistryClient};
use berth_volume::VolumeService;
use std::sync::Arc;

/// Image providing the guest's initial user space. Always pulled for the
/// host platform, whatever platform the container itself requests.
pub const DEFAULT_INIT_IMAGE: &str = "ghcr.io/berth-vm/vminit:latest";

pub struct ConfigurationPipeline {
    images: Arc<ImageService>,
    kernels: Arc<KernelService>,
    networks: Arc<NetworkService>,
    volumes: Arc<VolumeService>,
    init_image: String,
    default_domain: Option<String>,
}

impl ConfigurationPipeline {
    pub fn new(
        images: Arc<ImageService>,
        kernels: Arc<KernelService>,
        networks: Arc<NetworkService>,
        volumes: Arc<VolumeService>,
        default_domain: Option<String>,
    ) -> Self {
        Self {
            images,
            kernels,
            networks,
            volumes,
            init_image: DEFAULT_INIT_IMAGE.to_string(),
            default_domain,
        }
    }

    pub fn with_init_image(mut self, reference: &str) -> Self {
        self.init_image = reference.to_string();
        self
    }

    /// Runs every stage and produces the immutable configuration plus the
    /// kernel to boot it with.
    pub async fn assemble(
        &self,
        id: &str,
        registry: &Arc<RegistryClient>,
        request: &CreateContainerRequest,
        progress: ProgressSink,
    ) -> Result<(ContainerConfiguration, Kernel), ContainerError> {
        let management = &request.management;

        let platform = config::resolve_platform(
            management.os.as_deref(),
            management.arch.as_deref(),
            management.platform.as_deref(),
        )?;

        let reference = ImageReference::parse(&request.image)?;
        let init_reference = ImageReference::parse(&self.init_image)?;

        let coordinator = ProgressCoordinator::new(progress);
        let image_task = coordinator.task();
        let kernel_task = coordinator.task();
        let init_task = coordinator.task();

        // Image, kernel, and init image move in parallel; `try_join!`
        // drops the other branches as soon as one fails.
        let image_stage = async {
            image_task.describe("Fetching image");
            let pulled = self
                .images
                .pull(registry, &reference, &platform, &image_task)
                .await?;
            image_task.describe("Unpacking image");
            let rootfs = self.images.unpack(&pulled).await?;
            Ok::<_, ContainerError>((pulled, rootfs))
        };

        let kernel_stage = async {
            kernel_task.describe("Fetching kernel");
            match &management.kernel {
                Some(path) => {
                    if !path.is_file() {
                        return Err(ContainerError::Kernel(berth_kernel::KernelError::NotFound(
                            path.display().to_string(),
                        )));
                    }
                    Ok(Kernel {
                        path: path.clone(),
                        platform: Platform::new("linux", &platform.architecture),
                    })
                }
                None => Ok(self.kernels.get_default(&platform.architecture).await?),
            }
        };

        let init_stage = async {
            init_task.describe("Fetching init image");
            let host_platform = Platform::host();
            let pulled = self
                .images
                .pull(registry, &init_reference, &host_platform, &init_task)
                .await?;
            init_task.describe("Unpacking init image");
            let initfs = self.images.unpack(&pulled).await?;
            Ok::<_, ContainerError>(initfs)
        };

        let ((image, rootfs), kernel, initfs) =
            tokio::try_join!(image_stage, kernel_stage, init_stage)?;
        drop((image_task, kernel_task, init_task));

        let runtime_config = image.config.config.clone().unwrap_or_default();
        let defaults = config::ImageDefaults {
            entrypoint: runtime_config.entrypoint.unwrap_or_default(),
            cmd: runtime_config.cmd.unwrap_or_default(),
            env: runtime_config.env.unwrap_or_default(),
            working_dir: runtime_config.working_dir,
            user: runtime_config.user,
        };

        let lookup = |key: &str| std::env::var(key).ok();
        let process = config::resolve_process(
            &request.arguments,
            &request.process,
            management.entrypoint.as_deref(),
            &defaults,
            &lookup,
        )?;

        let resources = config::parse_resources(&request.resources)?;
        let mounts = self.resolve_mounts(management).await?;
        let networks = self.resolve_networks(id, management).await?;

        let dns = if management.dns_disabled {
            None
        } else {
            Some(DnsConfiguration {
                nameservers: management.dns_nameservers.clone(),
                search_domains: management.dns_search.clone(),
                options: management.dns_options.clone(),
                domain: management
                    .dns_domain
                    .clone()
                    .or_else(|| self.default_domain.clone()),
            })
        };

        let rosetta =
            Platform::host_architecture() == "arm64" && platform.architecture == "amd64";

        let labels = config::parse_labels(&management.labels)?;

        let mut published_ports = Vec::new();
        for spec in &management.publish_ports {
            published_ports.push(config::parse_publish_port(spec)?);
        }
        let mut published_sockets = Vec::new();
        for spec in &management.publish_sockets {
            published_sockets.push(config::parse_publish_socket(spec)?);
        }

        let configuration = ContainerConfiguration {
            id: id.to_string(),
            image: ImageDescriptor {
                reference: request.image.clone(),
                digest: image.digest.to_string(),
            },
            process,
            resources,
            platform,
            rootfs,
            initfs,
            mounts,
            networks,
            dns,
            labels,
            published_ports,
            published_sockets,
            ssh: management.ssh,
            rosetta,
            virtualization: VirtualizationOptions {
                nested: management.virtualization,
            },
        };
        configuration
            .validate()
            .map_err(ContainerError::InvalidArgument)?;

        Ok((configuration, kernel))
    }

    /// Mount order: tmpfs entries, then `--volume` flags, then `--mount`
    /// directives, each flag list de-duplicated on its raw value.
    async fn resolve_mounts(
        &self,
        management: &berth_core::api::ManagementOptions,
    ) -> Result<Vec<Mount>, ContainerError> {
        let is_volume_name = |name: &str| berth_volume::is_valid_name(name);

        let mut mounts = config::parse_tmpfs_list(&management.tmpfs);

        for spec in dedupe(&management.volumes) {
            let parsed = config::parse_volume_spec(&spec, &is_volume_name)?;
            mounts.push(self.resolve_parsed(parsed).await?);
        }
        for directive in dedupe(&management.mounts) {
            let parsed = config::parse_mount_directive(&directive, &is_volume_name)?;
            mounts.push(self.resolve_parsed(parsed).await?);
        }

        for mount in &mounts {
            if mount.mount_type == MountType::Volume {
                // Volume sources come from the service and are validated
                // against the destination rules only.
                if mount.destination.is_empty() || !mount.destination.starts_with('/') {
                    return Err(ContainerError::InvalidArgument(format!(
                        "mount destination is not absolute: {}",
                        mount.destination
                    )));
                }
            } else {
                config::validate_mount(mount)?;
            }
        }
        Ok(mounts)
    }

    async fn resolve_parsed(
        &self,
        parsed: config::ParsedMount,
    ) -> Result<Mount, ContainerError> {
        match parsed {
            config::ParsedMount::Filesystem(mount) => Ok(mount),
            config::ParsedMount::Volume(reference) => self.resolve_volume(reference).await,
        }
    }

    /// Joins a named-volume reference against the volume inventory. A
    /// volume that does not exist fails the whole assembly.
    async fn resolve_volume(&self, reference: ParsedVolume) -> Result<Mount, ContainerError> {
        let info = self
            .volumes
            .inspect(&reference.name)
            .await
            .map_err(|_| {
                ContainerError::InvalidArgument(format!("volume not found: {}", reference.name))
            })?;
        Ok(Mount {
            mount_type: MountType::Volume,
            source: info.source.to_string_lossy().into_owned(),
            destination: reference.destination,
            options: reference.options,
        })
    }

    /// Builds the attachment list. The first network carries the fully
    /// qualified hostname (`<id>.<domain>.`) when a default domain is
    /// known; the rest use the bare id. Non-default network sets need a
    /// host new enough to support them.
    async fn resolve_networks(
        &self,
        id: &str,
        management: &berth_core::api::ManagementOptions,
    ) -> Result<Vec<Attachment>, ContainerError> {
        let requested: Vec<String> = if management.networks.is_empty() {
            vec![DEFAULT_NETWORK_ID.to_string()]
        } else {
            management.networks.clone()
        };

        let is_default_only = requested == [DEFAULT_NETWORK_ID.to_string()];
        if !is_default_only && !host_supports_custom_networks() {
            return Err(ContainerError::InvalidState(
                "non-default networks require a newer host OS".to_string(),
            ));
        }

        let domain = management
            .dns_domain
            .clone()
            .or_else(|| self.default_domain.clone());

        let mut attachments = Vec::with_capacity(requested.len());
        for (index, network_id) in requested.iter().enumerate() {
            let status = self
                .networks
                .get(network_id)
                .await
                .ok_or_else(|| ContainerError::NotFound(format!("network not found: {network_id}")))?;
            if status.state != berth_core::api::NetworkState::Running {
                return Err(ContainerError::InvalidState(format!(
                    "network {network_id} is not running"
                )));
            }

            let hostname = match (&domain, index) {
                (Some(domain), 0) => format!("{id}.{domain}."),
                _ => id.to_string(),
            };
            attachments.push(Attachment {
                network: network_id.clone(),
                hostname,
            });
        }
        Ok(attachments)
    }
}

fn dedupe(entries: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for entry in entries {
        if !seen.contains(entry) {
            seen.push(entry.clone());
        }
    }
    seen
}

/// Custom network sets need host virtual-network features that older
/// releases lack; the default network works everywhere.
fn host_supports_custom_networks() -> bool {
    #[cfg(target_os = "macos")]
    {
        use std::sync::OnceLock;
        static SUPPORTED: OnceLock<bool> = OnceLock::new();
        *SUPPORTED.get_or_init(|| {
            let output = std::process::Command::new("sw_vers")
                .arg("-productVersion")
                .output();
            match output {
                Ok(output) => {
                    let version = String::from_utf8_lossy(&output.stdout);
                    version
                        .trim()
                        .split('.')
                        .next()
                        .and_then(|major| major.parse::<u32>().ok())
                        .is_some_and(|major| major >= 15)
                }
                Err(_) => false,
            }
        })
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_preserves_first_occurrence_order() {
        let entries = vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            "c".to_string(),
        ];
        assert_eq!(dedupe(&entries), vec!["a", "b", "c"]);
    }
}
