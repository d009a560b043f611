use crate::error::ConfigError;
use crate::memory::parse_memory_mib;
use berth_core::api::ResourceOptions;
use berth_core::Resources;

/// Applies `--cpus`/`--memory` on top of the defaults.
pub fn parse_resources(options: &ResourceOptions) -> Result<Resources, ConfigError> {
    let mut resources = Resources::default();
    if let Some(cpus) = options.cpus {
        resources.cpus = cpus;
    }
    if let Some(memory) = &options.memory {
        let mebibytes = parse_memory_mib(memory)?;
        resources.memory_bytes = mebibytes.checked_mul(1_048_576).ok_or_else(|| {
            ConfigError::InvalidArgument(format!("memory value overflow: {memory}"))
        })?;
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let r = parse_resources(&ResourceOptions::default()).unwrap();
        assert_eq!(r, Resources::default());
    }

    #[test]
    fn test_explicit_values() {
        let r = parse_resources(&ResourceOptions {
            cpus: Some(2),
            memory: Some("2g".to_string()),
        })
        .unwrap();
        assert_eq!(r.cpus, 2);
        assert_eq!(r.memory_bytes, 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_bad_memory_string_rejected() {
        let r = parse_resources(&ResourceOptions {
            cpus: None,
            memory: Some("lots".to_string()),
        });
        assert!(r.is_err());
    }
}
