use crate::error::ImageError;
use berth_core::Platform;
use berth_progress::TaskHandle;
use berth_remote::{ImageConfigFile, ImageReference, Manifest, RegistryClient};
use berth_store::{Digest, ImageStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A pulled, stored image ready for unpacking.
#[derive(Debug, Clone)]
pub struct PulledImage {
    pub reference: ImageReference,
    pub digest: Digest,
    pub manifest: Manifest,
    pub config: ImageConfigFile,
}

pub struct ImageService {
    store: Arc<ImageStore>,
    max_concurrent_downloads: usize,
}

impl ImageService {
    pub fn new(store: Arc<ImageStore>, max_concurrent_downloads: usize) -> Self {
        Self {
            store,
            max_concurrent_downloads: max_concurrent_downloads.max(1),
        }
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    /// Fetches the manifest, config, and layers of `reference` for the
    /// given platform. Layers download concurrently, bounded by the
    /// service's limit; each completed layer advances the task counter.
    pub async fn pull(
        &self,
        client: &Arc<RegistryClient>,
        reference: &ImageReference,
        platform: &Platform,
        task: &TaskHandle,
    ) -> Result<PulledImage, ImageError> {
        tracing::info!(image = %reference, platform = %platform, "pulling image");

        let (manifest, manifest_digest) = client.manifest_for_platform(reference, platform).await?;

        let config_digest = Digest::parse(&manifest.config.digest)?;
        if !self.store.has_blob(&config_digest).await {
            let bytes = client.blob(reference, &manifest.config.digest).await?;
            self.store.put_blob(&bytes, Some(&config_digest)).await?;
        }
        let config: ImageConfigFile =
            serde_json::from_slice(&self.store.get_blob(&config_digest).await?)
                .map_err(|e| ImageError::InvalidConfig(e.to_string()))?;

        task.set_items("blobs", manifest.layers.len() as u64);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_downloads));
        let mut downloads = tokio::task::JoinSet::new();
        for layer in &manifest.layers {
            let expected = Digest::parse(&layer.digest)?;
            if self.store.has_blob(&expected).await {
                task.advance(1);
                continue;
            }
            let client = client.clone();
            let store = self.store.clone();
            let reference = reference.clone();
            let digest_str = layer.digest.clone();
            let semaphore = semaphore.clone();
            downloads.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let bytes = client.blob(&reference, &digest_str).await?;
                store.put_blob(&bytes, Some(&expected)).await?;
                Ok::<(), ImageError>(())
            });
        }

        while let Some(joined) = downloads.join_next().await {
            match joined {
                Ok(Ok(())) => task.advance(1),
                Ok(Err(e)) => {
                    downloads.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    downloads.abort_all();
                    return Err(ImageError::Io(std::io::Error::other(e)));
                }
            }
        }

        let manifest_bytes = serde_json::to_vec(&manifest)
            .map_err(|e| ImageError::InvalidConfig(e.to_string()))?;
        let stored_digest = self.store.put_manifest(&manifest_bytes).await?;
        self.store
            .set_tag(&reference.repository, reference.tag_or_default(), &stored_digest)
            .await?;
        tracing::debug!(digest = %manifest_digest, "image pulled");

        Ok(PulledImage {
            reference: reference.clone(),
            digest: stored_digest,
            manifest,
            config,
        })
    }

    /// Extracts the image's layers into its merged root filesystem,
    /// returning the directory. A previously unpacked image returns
    /// immediately.
    pub async fn unpack(&self, image: &PulledImage) -> Result<PathBuf, ImageError> {
        if self.store.has_rootfs(&image.digest).await {
            return Ok(self.store.rootfs_dir(&image.digest));
        }

        let mut layers = Vec::with_capacity(image.manifest.layers.len());
        for layer in &image.manifest.layers {
            let digest = Digest::parse(&layer.digest)?;
            layers.push(self.store.get_blob(&digest).await?);
        }
        let path = self.store.unpack_rootfs(&image.digest, &layers).await?;
        Ok(path)
    }

    /// Looks up a previously pulled image without touching the network.
    pub async fn find_local(
        &self,
        reference: &ImageReference,
    ) -> Result<Option<PulledImage>, ImageError> {
        let digest = match self
            .store
            .get_tag(&reference.repository, reference.tag_or_default())
            .await
        {
            Ok(d) => d,
            Err(berth_store::StoreError::ImageNotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_slice(&self.store.get_manifest(&digest).await?)
            .map_err(|e| ImageError::InvalidConfig(e.to_string()))?;
        let config_digest = Digest::parse(&manifest.config.digest)?;
        let config: ImageConfigFile =
            serde_json::from_slice(&self.store.get_blob(&config_digest).await?)
                .map_err(|e| ImageError::InvalidConfig(e.to_string()))?;
        Ok(Some(PulledImage {
            reference: reference.clone(),
            digest,
            manifest,
            config,
        }))
    }
}
