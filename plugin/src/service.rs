use crate::error::PluginError;
use crate::loader::{Plugin, PluginLoader};
use berth_core::api::PluginInfo;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Tracks which discovered plugins are running and supervises their
/// processes.
pub struct PluginService {
    loader: Arc<PluginLoader>,
    running: Mutex<HashMap<String, Child>>,
}

impl PluginService {
    pub fn new(loader: Arc<PluginLoader>) -> Self {
        Self {
            loader,
            running: Mutex::new(HashMap::new()),
        }
    }

    pub fn loader(&self) -> &Arc<PluginLoader> {
        &self.loader
    }

    /// Launches every plugin whose config declares `shouldBoot`.
    pub async fn boot_plugins(&self) -> Result<(), PluginError> {
        for plugin in self.loader.load_all()? {
            if plugin.config.should_boot {
                tracing::info!(plugin = %plugin.name, "booting plugin");
                self.load(&plugin.name).await?;
            }
        }
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<PluginInfo, PluginError> {
        let plugin = self
            .loader
            .find_plugin(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        Ok(self.describe(&plugin).await)
    }

    pub async fn list(&self) -> Result<Vec<PluginInfo>, PluginError> {
        let mut infos = Vec::new();
        for plugin in self.loader.load_all()? {
            infos.push(self.describe(&plugin).await);
        }
        Ok(infos)
    }

    pub async fn load(&self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .loader
            .find_plugin(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        let mut running = self.running.lock().await;
        if running.contains_key(name) {
            return Ok(());
        }
        let child = Command::new(&plugin.binary)
            .args(&plugin.config.default_arguments)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PluginError::Launch {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(plugin = name, pid = child.id(), "plugin loaded");
        running.insert(name.to_string(), child);
        Ok(())
    }

    pub async fn unload(&self, name: &str) -> Result<(), PluginError> {
        let mut running = self.running.lock().await;
        let mut child = running
            .remove(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;
        let _ = child.kill().await;
        let _ = child.wait().await;
        tracing::info!(plugin = name, "plugin unloaded");
        Ok(())
    }

    pub async fn restart(&self, name: &str) -> Result<(), PluginError> {
        // A plugin that is not running restarts into the running state.
        let _ = self.unload(name).await;
        self.load(name).await
    }

    async fn describe(&self, plugin: &Plugin) -> PluginInfo {
        let loaded = self.running.lock().await.contains_key(&plugin.name);
        PluginInfo {
            name: plugin.name.clone(),
            binary: plugin.binary.clone(),
            summary: plugin.config.summary.clone(),
            author: plugin.config.author.clone(),
            services: plugin.config.services_offered.clone(),
            should_boot: plugin.config.should_boot,
            loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn add_script_plugin(dir: &Path, name: &str) {
        let plugin_dir = dir.join(name);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        let binary = plugin_dir.join(name);
        std::fs::write(&binary, "#!/bin/sh\nsleep 30\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(plugin_dir.join("config.json"), r#"{"abstract":"t"}"#).unwrap();
    }

    #[tokio::test]
    async fn test_load_unload_cycle() {
        let dir = TempDir::new().unwrap();
        add_script_plugin(dir.path(), "helper");

        let loader = Arc::new(PluginLoader::new(vec![dir.path().to_path_buf()]));
        let service = PluginService::new(loader);

        service.load("helper").await.unwrap();
        assert!(service.get("helper").await.unwrap().loaded);

        service.unload("helper").await.unwrap();
        assert!(!service.get("helper").await.unwrap().loaded);
    }

    #[tokio::test]
    async fn test_unknown_plugin_is_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(PluginLoader::new(vec![dir.path().to_path_buf()]));
        let service = PluginService::new(loader);
        assert!(matches!(
            service.load("ghost").await,
            Err(PluginError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unload_without_load_is_invalid() {
        let dir = TempDir::new().unwrap();
        add_script_plugin(dir.path(), "helper");
        let loader = Arc::new(PluginLoader::new(vec![dir.path().to_path_buf()]));
        let service = PluginService::new(loader);
        assert!(matches!(
            service.unload("helper").await,
            Err(PluginError::NotLoaded(_))
        ));
    }
}
