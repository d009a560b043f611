//! Environment list assembly.

use crate::error::ConfigError;
use std::path::Path;

/// Splits `K=V`, allowing `=` inside the value. Returns `None` when there
/// is no `=` at all.
fn split_entry(entry: &str) -> Option<(&str, String)> {
    let mut parts = entry.splitn(3, '=');
    let key = parts.next()?;
    let first = parts.next()?;
    let value = match parts.next() {
        Some(rest) => format!("{first}={rest}"),
        None => first.to_string(),
    };
    Some((key, value))
}

/// Parses one env-file's contents. Blank lines and `#` comments are
/// skipped, as are entries with an empty key or empty value.
pub fn parse_env_file(contents: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = split_entry(line) else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        entries.push(format!("{key}={value}"));
    }
    entries
}

/// Produces the ordered process environment: image env, then each
/// env-file in order, then command-line entries. A command-line entry
/// without `=` is resolved against the daemon process environment via
/// `lookup` and silently dropped when the variable is absent.
pub fn merge_environment(
    image_env: &[String],
    env_files: &[impl AsRef<Path>],
    cli_env: &[String],
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<String>, ConfigError> {
    let mut merged: Vec<String> = image_env.to_vec();

    for path in env_files {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|_| {
            ConfigError::NotFound(format!("env file not found: {}", path.display()))
        })?;
        merged.extend(parse_env_file(&contents));
    }

    for entry in cli_env {
        if entry.contains('=') {
            merged.push(entry.clone());
        } else if let Some(value) = lookup(entry) {
            merged.push(format!("{entry}={value}"));
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_lookup(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_file_line_rules() {
        let contents = "FOO=bar\n# comment\n\n=novalue\nNOKEY=\n";
        assert_eq!(parse_env_file(contents), vec!["FOO=bar".to_string()]);
    }

    #[test]
    fn test_env_file_value_may_contain_equals() {
        assert_eq!(
            parse_env_file("URL=http://x/?a=b&c=d"),
            vec!["URL=http://x/?a=b&c=d".to_string()]
        );
    }

    #[test]
    fn test_merge_order_is_image_files_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FROM_FILE=1").unwrap();

        let merged = merge_environment(
            &["FROM_IMAGE=1".to_string()],
            &[file.path()],
            &["FROM_CLI=1".to_string()],
            &no_lookup,
        )
        .unwrap();
        assert_eq!(merged, vec!["FROM_IMAGE=1", "FROM_FILE=1", "FROM_CLI=1"]);
    }

    #[test]
    fn test_missing_env_file_is_not_found() {
        let err = merge_environment(
            &[],
            &[Path::new("/nonexistent/env")],
            &[],
            &no_lookup,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_bare_cli_key_resolved_from_daemon_env() {
        let lookup = |key: &str| {
            if key == "TERM" {
                Some("xterm".to_string())
            } else {
                None
            }
        };
        let files: &[&Path] = &[];
        let merged =
            merge_environment(&[], files, &["TERM".to_string()], &lookup).unwrap();
        assert_eq!(merged, vec!["TERM=xterm"]);
    }

    #[test]
    fn test_bare_cli_key_missing_is_dropped() {
        let files: &[&Path] = &[];
        let merged =
            merge_environment(&[], files, &["MISSING".to_string()], &no_lookup).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_cli_entry_with_empty_value_kept() {
        let files: &[&Path] = &[];
        let merged = merge_environment(&[], files, &["EMPTY=".to_string()], &no_lookup).unwrap();
        assert_eq!(merged, vec!["EMPTY="]);
    }
}
