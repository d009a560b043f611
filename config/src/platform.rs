use crate::error::ConfigError;
use berth_core::Platform;

/// Builds the requested platform from `--os`/`--arch`, letting an explicit
/// `--platform os/arch[/variant]` string win when both are given.
pub fn resolve_platform(
    os: Option<&str>,
    arch: Option<&str>,
    platform: Option<&str>,
) -> Result<Platform, ConfigError> {
    if let Some(p) = platform {
        if !p.is_empty() {
            return parse_platform_string(p);
        }
    }
    Ok(Platform {
        os: os.unwrap_or("linux").to_string(),
        architecture: normalize_architecture(arch.unwrap_or(Platform::host_architecture())),
        variant: None,
    })
}

fn parse_platform_string(input: &str) -> Result<Platform, ConfigError> {
    let parts: Vec<&str> = input.split('/').collect();
    if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidArgument(format!(
            "invalid platform: {input}"
        )));
    }
    Ok(Platform {
        os: parts[0].to_string(),
        architecture: normalize_architecture(parts[1]),
        variant: parts.get(2).map(|v| v.to_string()),
    })
}

fn normalize_architecture(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        a => a.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_string_wins_over_flags() {
        let p = resolve_platform(Some("linux"), Some("arm64"), Some("linux/amd64")).unwrap();
        assert_eq!(p.architecture, "amd64");
    }

    #[test]
    fn test_flags_used_without_platform_string() {
        let p = resolve_platform(Some("linux"), Some("amd64"), None).unwrap();
        assert_eq!(p.os, "linux");
        assert_eq!(p.architecture, "amd64");
        assert_eq!(p.variant, None);
    }

    #[test]
    fn test_variant_parsed() {
        let p = resolve_platform(None, None, Some("linux/arm64/v8")).unwrap();
        assert_eq!(p.variant.as_deref(), Some("v8"));
    }

    #[test]
    fn test_alternate_arch_spellings_normalized() {
        let p = resolve_platform(None, Some("x86_64"), None).unwrap();
        assert_eq!(p.architecture, "amd64");
        let p = resolve_platform(None, None, Some("linux/aarch64")).unwrap();
        assert_eq!(p.architecture, "arm64");
    }

    #[test]
    fn test_malformed_platform_strings_rejected() {
        assert!(resolve_platform(None, None, Some("linux")).is_err());
        assert!(resolve_platform(None, None, Some("linux//v8")).is_err());
        assert!(resolve_platform(None, None, Some("a/b/c/d")).is_err());
    }

    #[test]
    fn test_empty_platform_string_falls_back() {
        let p = resolve_platform(Some("linux"), Some("arm64"), Some("")).unwrap();
        assert_eq!(p.architecture, "arm64");
    }
}
