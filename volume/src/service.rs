use crate::error::VolumeError;
use berth_core::api::VolumeInfo;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::sync::RwLock;

const VOLUMES_DIR: &str = "volumes";
const METADATA_FILE: &str = "volume.json";
const DATA_DIR: &str = "data";

/// The volume name pattern: an alphanumeric first character followed by
/// at least one more character from `[A-Za-z0-9_.-]`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphanumeric() {
        return false;
    }
    let mut rest = 0usize;
    for c in chars {
        if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
            return false;
        }
        rest += 1;
    }
    rest >= 1
}

/// Named volumes materialised as directories under `<app_root>/volumes/`,
/// one `volume.json` plus a `data/` directory each.
pub struct VolumeService {
    root: PathBuf,
    volumes: RwLock<HashMap<String, VolumeInfo>>,
}

impl VolumeService {
    pub async fn new(app_root: &Path) -> Result<Self, VolumeError> {
        let root = app_root.join(VOLUMES_DIR);
        fs::create_dir_all(&root).await?;

        let mut volumes = HashMap::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata_path = entry.path().join(METADATA_FILE);
            if !metadata_path.exists() {
                continue;
            }
            let contents = fs::read(&metadata_path).await?;
            match serde_json::from_slice::<VolumeInfo>(&contents) {
                Ok(info) => {
                    volumes.insert(info.name.clone(), info);
                }
                Err(e) => {
                    tracing::warn!(path = %metadata_path.display(), error = %e, "skipping unreadable volume metadata");
                }
            }
        }

        Ok(Self {
            root,
            volumes: RwLock::new(volumes),
        })
    }

    pub async fn create(
        &self,
        name: &str,
        labels: HashMap<String, String>,
    ) -> Result<VolumeInfo, VolumeError> {
        if !is_valid_name(name) {
            return Err(VolumeError::InvalidName(name.to_string()));
        }

        let mut volumes = self.volumes.write().await;
        if volumes.contains_key(name) {
            return Err(VolumeError::AlreadyExists(name.to_string()));
        }

        let source = self.root.join(name).join(DATA_DIR);
        fs::create_dir_all(&source).await?;

        let info = VolumeInfo {
            name: name.to_string(),
            source,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            labels,
        };
        let contents = serde_json::to_vec_pretty(&info)?;
        fs::write(self.root.join(name).join(METADATA_FILE), contents).await?;

        volumes.insert(name.to_string(), info.clone());
        tracing::info!(volume = name, "created volume");
        Ok(info)
    }

    pub async fn delete(&self, name: &str) -> Result<(), VolumeError> {
        let mut volumes = self.volumes.write().await;
        if volumes.remove(name).is_none() {
            return Err(VolumeError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(self.root.join(name)).await?;
        tracing::info!(volume = name, "deleted volume");
        Ok(())
    }

    pub async fn list(&self) -> Vec<VolumeInfo> {
        let volumes = self.volumes.read().await;
        let mut list: Vec<VolumeInfo> = volumes.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub async fn inspect(&self, name: &str) -> Result<VolumeInfo, VolumeError> {
        self.volumes
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| VolumeError::NotFound(name.to_string()))
    }
}
