use crate::error::KernelError;
use crate::extract::extract_entry;
use berth_core::{Kernel, Platform};
use berth_progress::TaskHandle;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const KERNELS_DIR: &str = "kernels";

/// Manages `<app_root>/kernels/`. Operations serialise on an internal
/// lock; the directory is a per-architecture namespace where
/// `default.kernel-<arch>` links to the kernel used when no explicit
/// `--kernel` is given.
pub struct KernelService {
    root: PathBuf,
    lock: Mutex<()>,
}

impl KernelService {
    pub async fn new(app_root: &Path) -> Result<Self, KernelError> {
        let root = app_root.join(KERNELS_DIR);
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn default_link(&self, architecture: &str) -> PathBuf {
        self.root.join(format!("default.kernel-{architecture}"))
    }

    /// Copies `source` into the kernel directory and makes it the default
    /// for `architecture`. If updating the default link fails, the copied
    /// file is removed again.
    pub async fn install_from_file(
        &self,
        source: &Path,
        architecture: &str,
        force: bool,
    ) -> Result<Kernel, KernelError> {
        let _guard = self.lock.lock().await;

        let file_name = source
            .file_name()
            .ok_or_else(|| {
                KernelError::InvalidArgument(format!(
                    "kernel source has no file name: {}",
                    source.display()
                ))
            })?
            .to_owned();
        let installed = self.root.join(&file_name);

        if installed.exists() && !force {
            return Err(KernelError::AlreadyInstalled(
                file_name.to_string_lossy().into_owned(),
            ));
        }
        fs::copy(source, &installed).await?;

        // Cancellation point between the copy and the default update.
        tokio::task::yield_now().await;

        if let Err(e) = self.set_default(&installed, architecture).await {
            let _ = fs::remove_file(&installed).await;
            return Err(e);
        }

        tracing::info!(
            kernel = %installed.display(),
            architecture,
            "installed kernel"
        );
        Ok(Kernel {
            path: installed,
            platform: Platform::new("linux", architecture),
        })
    }

    /// Installs a kernel file extracted out of a tar archive. A `source`
    /// that is not an existing local path is downloaded first.
    pub async fn install_from_tar(
        &self,
        source: &str,
        entry_path: &str,
        architecture: &str,
        force: bool,
        task: &TaskHandle,
    ) -> Result<Kernel, KernelError> {
        let staging = tempfile::TempDir::new_in(&self.root)?;

        let archive_path = if Path::new(source).exists() {
            PathBuf::from(source)
        } else {
            let downloaded = staging.path().join("kernel-archive");
            self.download(source, &downloaded, task).await?;
            downloaded
        };

        task.describe("Extracting kernel");
        let entry = entry_path.to_string();
        let data = tokio::task::spawn_blocking(move || extract_entry(&archive_path, &entry))
            .await
            .map_err(|e| KernelError::Extraction(e.to_string()))??;

        let file_name = Path::new(entry_path)
            .file_name()
            .ok_or_else(|| {
                KernelError::InvalidArgument(format!("invalid archive entry: {entry_path}"))
            })?
            .to_owned();
        let extracted = staging.path().join(file_name);
        fs::write(&extracted, &data).await?;

        self.install_from_file(&extracted, architecture, force).await
    }

    /// Resolves the default kernel for an architecture.
    pub async fn get_default(&self, architecture: &str) -> Result<Kernel, KernelError> {
        let link = self.default_link(architecture);
        let target = fs::read_link(&link).await.map_err(|_| {
            KernelError::NotFound(format!("no default kernel for {architecture}"))
        })?;
        let path = if target.is_absolute() {
            target
        } else {
            self.root.join(target)
        };
        if !path.exists() {
            return Err(KernelError::NotFound(format!(
                "default kernel for {architecture} points at a missing file"
            )));
        }
        Ok(Kernel {
            path,
            platform: Platform::new("linux", architecture),
        })
    }

    async fn set_default(&self, installed: &Path, architecture: &str) -> Result<(), KernelError> {
        let link = self.default_link(architecture);
        match fs::remove_file(&link).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let target = installed
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| installed.to_path_buf());
        fs::symlink(target, &link).await?;
        Ok(())
    }

    async fn download(
        &self,
        url: &str,
        destination: &Path,
        task: &TaskHandle,
    ) -> Result<(), KernelError> {
        use tokio::io::AsyncWriteExt;

        task.describe("Fetching kernel");
        tracing::info!(url, "downloading kernel archive");

        let mut response = reqwest::get(url).await?.error_for_status()?;
        if let Some(total) = response.content_length() {
            task.set_items("bytes", total);
        }

        let mut file = fs::File::create(destination).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            task.advance(chunk.len() as u64);
        }
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_progress::ProgressCoordinator;
    use tempfile::TempDir;

    async fn service(dir: &TempDir) -> KernelService {
        KernelService::new(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_install_sets_default() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir).await;

        let source = dir.path().join("vmlinux");
        fs::write(&source, b"kernel").await.unwrap();

        let kernel = svc.install_from_file(&source, "arm64", false).await.unwrap();
        assert!(kernel.path.exists());

        let default = svc.get_default("arm64").await.unwrap();
        assert_eq!(default.path, kernel.path);
        assert_eq!(default.platform.architecture, "arm64");
    }

    #[tokio::test]
    async fn test_reinstall_requires_force() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir).await;

        let source = dir.path().join("vmlinux");
        fs::write(&source, b"kernel").await.unwrap();

        svc.install_from_file(&source, "arm64", false).await.unwrap();
        let err = svc
            .install_from_file(&source, "arm64", false)
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::AlreadyInstalled(_)));

        svc.install_from_file(&source, "arm64", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_defaults_are_per_architecture() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir).await;

        let source = dir.path().join("vmlinux-arm");
        fs::write(&source, b"arm kernel").await.unwrap();
        svc.install_from_file(&source, "arm64", false).await.unwrap();

        assert!(svc.get_default("arm64").await.is_ok());
        let err = svc.get_default("amd64").await.unwrap_err();
        assert!(matches!(err, KernelError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_install_from_tar_archive() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir).await;

        let archive_path = dir.path().join("kernel.tar");
        let file = std::fs::File::create(&archive_path).unwrap();
        let mut builder = tar::Builder::new(file);
        let data = b"tar kernel";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "boot/vmlinux", &data[..])
            .unwrap();
        builder.finish().unwrap();

        let (coordinator, _rx) = ProgressCoordinator::channel();
        let task = coordinator.task();
        let kernel = svc
            .install_from_tar(
                archive_path.to_str().unwrap(),
                "boot/vmlinux",
                "arm64",
                false,
                &task,
            )
            .await
            .unwrap();
        assert_eq!(fs::read(&kernel.path).await.unwrap(), b"tar kernel");
        assert!(svc.get_default("arm64").await.is_ok());
    }
}
