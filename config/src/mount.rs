//! The `--mount` / `--volume` / `--tmpfs` mini-language.

use crate::error::ConfigError;
use crate::memory::tmpfs_size_bytes;
use berth_core::{Mount, MountType, ParsedVolume};
use std::path::{Path, PathBuf};

/// What a mount flag parses into: either a ready filesystem mount, or a
/// named-volume reference resolved against the volume service later.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMount {
    Filesystem(Mount),
    Volume(ParsedVolume),
}

#[derive(Default)]
struct Directives {
    mount_type: Option<String>,
    source: Option<String>,
    destination: Option<String>,
    readonly: bool,
    size: Option<String>,
    mode: Option<String>,
}

/// Parses a `--mount` directive string: comma-separated `key=value` pairs
/// plus the valueless `ro`. Unknown keys are rejected; `type` defaults to
/// `virtiofs`, and `bind` is accepted as an alias for it.
pub fn parse_mount_directive(
    input: &str,
    is_volume_name: &dyn Fn(&str) -> bool,
) -> Result<ParsedMount, ConfigError> {
    let mut directives = Directives::default();

    for pair in input.split(',') {
        if pair.is_empty() {
            return Err(ConfigError::InvalidArgument(format!(
                "empty mount directive in: {input}"
            )));
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (pair, None),
        };
        match (key, value) {
            ("ro" | "readonly", None) => directives.readonly = true,
            ("ro" | "readonly", Some(_)) => {
                return Err(ConfigError::InvalidArgument(format!(
                    "mount option {key} takes no value"
                )))
            }
            ("type", Some(v)) => directives.mount_type = Some(v.to_string()),
            ("source" | "src", Some(v)) => directives.source = Some(v.to_string()),
            ("destination" | "dst" | "target", Some(v)) => {
                directives.destination = Some(v.to_string())
            }
            ("size", Some(v)) => directives.size = Some(v.to_string()),
            ("mode", Some(v)) => directives.mode = Some(v.to_string()),
            ("type" | "source" | "src" | "destination" | "dst" | "target" | "size" | "mode", None) => {
                return Err(ConfigError::InvalidArgument(format!(
                    "mount option {key} requires a value"
                )))
            }
            (other, _) => {
                return Err(ConfigError::InvalidArgument(format!(
                    "unknown mount option: {other}"
                )))
            }
        }
    }

    let mount_type = directives.mount_type.as_deref().unwrap_or("virtiofs");
    let destination = directives.destination.clone().unwrap_or_default();

    if mount_type != "tmpfs" && (directives.size.is_some() || directives.mode.is_some()) {
        return Err(ConfigError::InvalidArgument(
            "size and mode are only valid for tmpfs mounts".to_string(),
        ));
    }

    match mount_type {
        "tmpfs" => {
            if directives.source.is_some() {
                return Err(ConfigError::InvalidArgument(
                    "tmpfs mounts may not have a source".to_string(),
                ));
            }
            let mut options = Vec::new();
            if directives.readonly {
                options.push("ro".to_string());
            }
            if let Some(size) = &directives.size {
                options.push(format!("size={}", tmpfs_size_bytes(size)?));
            }
            if let Some(mode) = &directives.mode {
                options.push(format!("mode={mode}"));
            }
            Ok(ParsedMount::Filesystem(Mount::tmpfs(destination, options)))
        }
        "volume" => {
            let name = directives.source.ok_or_else(|| {
                ConfigError::InvalidArgument("volume mounts require a source".to_string())
            })?;
            if !is_volume_name(&name) {
                return Err(ConfigError::InvalidArgument(format!(
                    "invalid volume name: {name}"
                )));
            }
            let options = if directives.readonly {
                vec!["ro".to_string()]
            } else {
                Vec::new()
            };
            Ok(ParsedMount::Volume(ParsedVolume {
                name,
                destination,
                options,
            }))
        }
        "virtiofs" | "bind" => {
            let source = directives.source.ok_or_else(|| {
                ConfigError::InvalidArgument(format!("{mount_type} mounts require a source"))
            })?;
            let source = resolve_host_directory(&source)?;
            let options = if directives.readonly {
                vec!["ro".to_string()]
            } else {
                Vec::new()
            };
            Ok(ParsedMount::Filesystem(Mount::virtiofs(
                source,
                destination,
                options,
            )))
        }
        other => Err(ConfigError::InvalidArgument(format!(
            "unknown mount type: {other}"
        ))),
    }
}

/// Parses a `--volume src:dst[:opts]` value. A `/`-prefixed source is a
/// host bind; anything else is a named-volume reference.
pub fn parse_volume_spec(
    input: &str,
    is_volume_name: &dyn Fn(&str) -> bool,
) -> Result<ParsedMount, ConfigError> {
    let trimmed = input.trim_start_matches(':');
    let parts: Vec<&str> = trimmed.split(':').collect();
    match parts.len() {
        1 => {
            return Err(ConfigError::InvalidArgument(
                "anonymous volumes are not supported".to_string(),
            ))
        }
        2 | 3 => {}
        _ => {
            return Err(ConfigError::InvalidArgument(format!(
                "invalid volume specification: {input}"
            )))
        }
    }

    let source = parts[0];
    let destination = parts[1].to_string();
    let options: Vec<String> = parts
        .get(2)
        .map(|opts| opts.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    if source.starts_with('/') {
        let source = resolve_host_directory(source)?;
        Ok(ParsedMount::Filesystem(Mount::virtiofs(
            source,
            destination,
            options,
        )))
    } else {
        if !is_volume_name(source) {
            return Err(ConfigError::InvalidArgument(format!(
                "invalid volume name: {source}"
            )));
        }
        Ok(ParsedMount::Volume(ParsedVolume {
            name: source.to_string(),
            destination,
            options,
        }))
    }
}

/// Turns the `--tmpfs` list into mounts, de-duplicating repeated values
/// (textual equality) before parsing.
pub fn parse_tmpfs_list(entries: &[String]) -> Vec<Mount> {
    let mut seen = Vec::new();
    let mut mounts = Vec::new();
    for entry in entries {
        if seen.contains(entry) {
            continue;
        }
        seen.push(entry.clone());
        mounts.push(Mount::tmpfs(entry.clone(), Vec::new()));
    }
    mounts
}

/// Post-parse validation applied to every filesystem mount: destination is
/// a non-empty absolute path, and non-tmpfs sources are existing absolute
/// host directories.
pub fn validate_mount(mount: &Mount) -> Result<(), ConfigError> {
    if mount.destination.is_empty() {
        return Err(ConfigError::InvalidArgument(
            "mount destination is empty".to_string(),
        ));
    }
    if !mount.destination.starts_with('/') {
        return Err(ConfigError::InvalidArgument(format!(
            "mount destination is not absolute: {}",
            mount.destination
        )));
    }
    if mount.mount_type != MountType::Tmpfs {
        let source = Path::new(&mount.source);
        if !source.is_absolute() {
            return Err(ConfigError::InvalidArgument(format!(
                "mount source is not absolute: {}",
                mount.source
            )));
        }
        if !source.exists() {
            return Err(ConfigError::NotFound(format!(
                "mount source does not exist: {}",
                mount.source
            )));
        }
    }
    Ok(())
}

/// Resolves a mount source to an absolute path and requires it to be an
/// existing directory.
fn resolve_host_directory(source: &str) -> Result<String, ConfigError> {
    let path = PathBuf::from(source);
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };
    let metadata = std::fs::metadata(&path)
        .map_err(|_| ConfigError::NotFound(format!("mount source does not exist: {source}")))?;
    if !metadata.is_dir() {
        return Err(ConfigError::InvalidArgument(format!(
            "mount source is not a directory: {source}"
        )));
    }
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_name(_: &str) -> bool {
        true
    }

    fn strict_name(name: &str) -> bool {
        name.chars().all(|c| c.is_ascii_alphanumeric())
    }

    #[test]
    fn test_volume_spec_host_bind() {
        let dir = tempfile::tempdir().unwrap();
        let spec = format!("{}:/data:ro", dir.path().display());
        let parsed = parse_volume_spec(&spec, &any_name).unwrap();
        match parsed {
            ParsedMount::Filesystem(m) => {
                assert_eq!(m.mount_type, MountType::Virtiofs);
                assert_eq!(m.source, dir.path().to_string_lossy());
                assert_eq!(m.destination, "/data");
                assert_eq!(m.options, vec!["ro"]);
            }
            other => panic!("expected filesystem mount, got {other:?}"),
        }
    }

    #[test]
    fn test_volume_spec_named_volume() {
        let parsed = parse_volume_spec("data:/var/lib/data", &any_name).unwrap();
        match parsed {
            ParsedMount::Volume(v) => {
                assert_eq!(v.name, "data");
                assert_eq!(v.destination, "/var/lib/data");
                assert!(v.options.is_empty());
            }
            other => panic!("expected volume reference, got {other:?}"),
        }
    }

    #[test]
    fn test_volume_spec_single_part_rejected() {
        let err = parse_volume_spec("/data", &any_name).unwrap_err();
        match err {
            ConfigError::InvalidArgument(m) => assert!(m.contains("anonymous")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_volume_spec_leading_colons_trimmed() {
        let parsed = parse_volume_spec("::data:/d", &any_name).unwrap();
        assert!(matches!(parsed, ParsedMount::Volume(_)));
    }

    #[test]
    fn test_volume_spec_missing_host_path() {
        let err = parse_volume_spec("/definitely/not/here:/data", &any_name).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_volume_spec_bad_name_rejected() {
        let err = parse_volume_spec("bad!name:/data", &strict_name).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn test_mount_directive_defaults_to_virtiofs() {
        let dir = tempfile::tempdir().unwrap();
        let input = format!("source={},destination=/data", dir.path().display());
        let parsed = parse_mount_directive(&input, &any_name).unwrap();
        match parsed {
            ParsedMount::Filesystem(m) => assert_eq!(m.mount_type, MountType::Virtiofs),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_mount_directive_bind_alias() {
        let dir = tempfile::tempdir().unwrap();
        let input = format!("type=bind,src={},dst=/data,ro", dir.path().display());
        let parsed = parse_mount_directive(&input, &any_name).unwrap();
        match parsed {
            ParsedMount::Filesystem(m) => {
                assert_eq!(m.mount_type, MountType::Virtiofs);
                assert_eq!(m.options, vec!["ro"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_mount_directive_tmpfs_size_and_mode() {
        let parsed =
            parse_mount_directive("type=tmpfs,destination=/tmp,size=64,mode=1777", &any_name)
                .unwrap();
        match parsed {
            ParsedMount::Filesystem(m) => {
                assert_eq!(m.mount_type, MountType::Tmpfs);
                assert_eq!(m.destination, "/tmp");
                assert!(m.options.contains(&"size=67108864".to_string()));
                assert!(m.options.contains(&"mode=1777".to_string()));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_mount_directive_tmpfs_size_overflow() {
        let err = parse_mount_directive(
            "type=tmpfs,destination=/tmp,size=9999999999999",
            &any_name,
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidArgument(m) => assert!(m.contains("overflow")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mount_directive_tmpfs_rejects_source() {
        let err =
            parse_mount_directive("type=tmpfs,source=/x,destination=/tmp", &any_name).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn test_mount_directive_size_requires_tmpfs() {
        let dir = tempfile::tempdir().unwrap();
        let input = format!("src={},dst=/d,size=64", dir.path().display());
        let err = parse_mount_directive(&input, &any_name).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn test_mount_directive_unknown_key_rejected() {
        let err = parse_mount_directive("type=tmpfs,destination=/t,flavor=mint", &any_name)
            .unwrap_err();
        match err {
            ConfigError::InvalidArgument(m) => assert!(m.contains("unknown mount option")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mount_directive_volume_reference() {
        let parsed =
            parse_mount_directive("type=volume,source=data,destination=/data,ro", &any_name)
                .unwrap();
        match parsed {
            ParsedMount::Volume(v) => {
                assert_eq!(v.name, "data");
                assert_eq!(v.options, vec!["ro"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_mount_directive_value_may_contain_equals() {
        let parsed =
            parse_mount_directive("type=tmpfs,destination=/t,mode=a=b", &any_name).unwrap();
        match parsed {
            ParsedMount::Filesystem(m) => {
                assert!(m.options.contains(&"mode=a=b".to_string()))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_tmpfs_list_dedupes_textually() {
        let mounts = parse_tmpfs_list(&[
            "/tmp".to_string(),
            "/run".to_string(),
            "/tmp".to_string(),
        ]);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].destination, "/tmp");
        assert_eq!(mounts[1].destination, "/run");
    }

    #[test]
    fn test_validate_rejects_empty_destination() {
        let dir = tempfile::tempdir().unwrap();
        let mount = Mount::virtiofs(dir.path().to_string_lossy(), "", vec![]);
        assert!(validate_mount(&mount).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let mount = Mount::virtiofs("/definitely/not/here", "/data", vec![]);
        assert!(matches!(
            validate_mount(&mount),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_validate_accepts_tmpfs_without_source() {
        let mount = Mount::tmpfs("/tmp", vec![]);
        assert!(validate_mount(&mount).is_ok());
    }

    #[test]
    fn test_directive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_string_lossy().into_owned();
        let mount = Mount::virtiofs(source.clone(), "/data", vec!["ro".to_string()]);

        let directive = format!("type=virtiofs,source={source},destination=/data,ro");
        let reparsed = parse_mount_directive(&directive, &any_name).unwrap();
        assert_eq!(reparsed, ParsedMount::Filesystem(mount));
    }
}
