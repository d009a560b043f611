use serde::{Deserialize, Serialize};

/// A plugin's `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    /// One-line description.
    #[serde(rename = "abstract", default)]
    pub summary: String,
    #[serde(default)]
    pub author: String,
    /// Service roles this plugin offers ("runtime", "network", ...).
    #[serde(default)]
    pub services_offered: Vec<String>,
    /// Launch this plugin during daemon bootstrap.
    #[serde(default)]
    pub should_boot: bool,
    /// Arguments passed when the daemon launches the binary.
    #[serde(default)]
    pub default_arguments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_config() {
        let json = r#"{
            "abstract": "Linux VM runtime helper",
            "author": "berth",
            "servicesOffered": ["runtime"],
            "shouldBoot": true,
            "defaultArguments": ["--log-level", "debug"]
        }"#;
        let config: PluginConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.summary, "Linux VM runtime helper");
        assert!(config.should_boot);
        assert_eq!(config.services_offered, vec!["runtime"]);
        assert_eq!(config.default_arguments.len(), 2);
    }

    #[test]
    fn test_missing_fields_default() {
        let config: PluginConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.should_boot);
        assert!(config.default_arguments.is_empty());
    }
}
