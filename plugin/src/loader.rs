use crate::config::PluginConfig;
use crate::error::PluginError;
use std::path::{Path, PathBuf};

/// A discovered plugin: its binary and parsed config.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub name: String,
    pub binary: PathBuf,
    pub config: PluginConfig,
}

/// Turns a directory entry into a plugin, or declines it. Factories are
/// applied in registration order; the first that accepts wins.
pub trait PluginFactory: Send + Sync {
    fn create(&self, entry: &Path) -> Option<Plugin>;
}

/// The standard layout: a directory named after the plugin containing
/// `config.json` and an equally named binary.
pub struct DirectoryPluginFactory;

impl PluginFactory for DirectoryPluginFactory {
    fn create(&self, entry: &Path) -> Option<Plugin> {
        if !entry.is_dir() {
            return None;
        }
        let name = entry.file_name()?.to_str()?.to_string();
        let binary = entry.join(&name);
        if !binary.is_file() {
            return None;
        }
        let config_bytes = std::fs::read(entry.join("config.json")).ok()?;
        let config: PluginConfig = match serde_json::from_slice(&config_bytes) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(plugin = %name, error = %e, "skipping plugin with unreadable config");
                return None;
            }
        };
        Some(Plugin {
            name,
            binary,
            config,
        })
    }
}

/// Scans an ordered list of directories for plugins.
pub struct PluginLoader {
    directories: Vec<PathBuf>,
    factories: Vec<Box<dyn PluginFactory>>,
}

impl PluginLoader {
    /// Keeps only the directories that exist, preserving order.
    pub fn new(candidate_dirs: Vec<PathBuf>) -> Self {
        let directories: Vec<PathBuf> = candidate_dirs
            .into_iter()
            .filter(|d| d.is_dir())
            .collect();
        tracing::debug!(?directories, "plugin scan directories");
        Self {
            directories,
            factories: vec![Box::new(DirectoryPluginFactory)],
        }
    }

    pub fn with_factory(mut self, factory: Box<dyn PluginFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// All plugins across the scan directories, unique by name; a name
    /// seen in an earlier directory shadows later occurrences. Directory
    /// entries that are symbolic links are followed once.
    pub fn load_all(&self) -> Result<Vec<Plugin>, PluginError> {
        let mut plugins: Vec<Plugin> = Vec::new();
        for dir in &self.directories {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .collect();
            entries.sort();

            for entry in entries {
                let candidate = match std::fs::read_link(&entry) {
                    Ok(target) if target.is_absolute() => target,
                    Ok(target) => dir.join(target),
                    Err(_) => entry,
                };
                for factory in &self.factories {
                    if let Some(plugin) = factory.create(&candidate) {
                        if !plugins.iter().any(|p| p.name == plugin.name) {
                            plugins.push(plugin);
                        }
                        break;
                    }
                }
            }
        }
        Ok(plugins)
    }

    /// First plugin with the given name in scan order.
    pub fn find_plugin(&self, name: &str) -> Option<Plugin> {
        self.load_all()
            .ok()?
            .into_iter()
            .find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_plugin(dir: &Path, name: &str, should_boot: bool) {
        let plugin_dir = dir.join(name);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(name), b"#!/bin/sh\n").unwrap();
        std::fs::write(
            plugin_dir.join("config.json"),
            format!(r#"{{"abstract":"{name}","shouldBoot":{should_boot}}}"#),
        )
        .unwrap();
    }

    #[test]
    fn test_discovers_plugins_sorted() {
        let dir = TempDir::new().unwrap();
        add_plugin(dir.path(), "zeta", false);
        add_plugin(dir.path(), "alpha", true);

        let loader = PluginLoader::new(vec![dir.path().to_path_buf()]);
        let plugins = loader.load_all().unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[0].name, "alpha");
        assert!(plugins[0].config.should_boot);
    }

    #[test]
    fn test_earlier_directories_shadow_later() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        add_plugin(first.path(), "runtime", true);
        add_plugin(second.path(), "runtime", false);
        add_plugin(second.path(), "extra", false);

        let loader = PluginLoader::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let plugins = loader.load_all().unwrap();
        assert_eq!(plugins.len(), 2);

        let runtime = loader.find_plugin("runtime").unwrap();
        assert!(runtime.config.should_boot, "first directory wins");
    }

    #[test]
    fn test_missing_directories_filtered() {
        let dir = TempDir::new().unwrap();
        add_plugin(dir.path(), "only", false);

        let loader = PluginLoader::new(vec![
            PathBuf::from("/nonexistent/plugins"),
            dir.path().to_path_buf(),
        ]);
        assert_eq!(loader.directories().len(), 1);
        assert_eq!(loader.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_symlinked_entry_followed_once() {
        let real = TempDir::new().unwrap();
        let scanned = TempDir::new().unwrap();
        add_plugin(real.path(), "linked", false);
        std::os::unix::fs::symlink(real.path().join("linked"), scanned.path().join("linked"))
            .unwrap();

        let loader = PluginLoader::new(vec![scanned.path().to_path_buf()]);
        assert!(loader.find_plugin("linked").is_some());
    }

    #[test]
    fn test_entries_without_config_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("bare")).unwrap();
        std::fs::write(dir.path().join("stray-file"), b"x").unwrap();

        let loader = PluginLoader::new(vec![dir.path().to_path_buf()]);
        assert!(loader.load_all().unwrap().is_empty());
    }
}
