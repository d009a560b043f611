//! Merging image defaults with CLI overrides into a launchable process.

use crate::env::merge_environment;
use crate::error::ConfigError;
use crate::user::{default_user_for_image, resolve_user};
use berth_core::api::ProcessOptions;
use berth_core::ProcessConfiguration;

/// The process-relevant slice of an image's configuration.
#[derive(Debug, Clone, Default)]
pub struct ImageDefaults {
    pub entrypoint: Vec<String>,
    pub cmd: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
}

/// Resolves the argument vector, environment, working directory and user
/// for the container process.
///
/// The vector starts from the `--entrypoint` override when given (which
/// discards the image's `cmd`), else from the image entrypoint; positional
/// arguments come next, or the image `cmd` when there are none and the
/// entrypoint was not overridden.
pub fn resolve_process(
    arguments: &[String],
    options: &ProcessOptions,
    entrypoint_override: Option<&str>,
    image: &ImageDefaults,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<ProcessConfiguration, ConfigError> {
    let overridden = entrypoint_override.is_some_and(|e| !e.is_empty());

    let mut argv: Vec<String> = Vec::new();
    if let Some(entrypoint) = entrypoint_override {
        if !entrypoint.is_empty() {
            argv.push(entrypoint.to_string());
        }
    }
    if !overridden && !image.entrypoint.is_empty() {
        argv.extend(image.entrypoint.iter().cloned());
    }
    if !arguments.is_empty() {
        argv.extend(arguments.iter().cloned());
    } else if !overridden {
        argv.extend(image.cmd.iter().cloned());
    }
    if argv.is_empty() {
        return Err(ConfigError::InvalidArgument(
            "Command/Entrypoint not specified".to_string(),
        ));
    }

    let working_directory = options
        .cwd
        .clone()
        .or_else(|| image.working_dir.clone().filter(|w| !w.is_empty()))
        .unwrap_or_else(|| "/".to_string());

    let environment = merge_environment(&image.env, &options.env_files, &options.env, lookup)?;

    let default_user = default_user_for_image(image.user.as_deref());
    let (user, supplemental_groups) = resolve_user(
        options.user.as_deref(),
        options.uid,
        options.gid,
        &default_user,
    );

    Ok(ProcessConfiguration {
        executable: argv[0].clone(),
        arguments: argv,
        environment,
        working_directory,
        terminal: options.tty,
        user,
        supplemental_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::ContainerUser;

    fn no_lookup(_: &str) -> Option<String> {
        None
    }

    fn image() -> ImageDefaults {
        ImageDefaults {
            entrypoint: vec!["/app".to_string()],
            cmd: vec!["--help".to_string()],
            env: vec!["PATH=/usr/bin".to_string()],
            working_dir: Some("/srv".to_string()),
            user: Some("nobody".to_string()),
        }
    }

    #[test]
    fn test_positional_args_replace_cmd() {
        let process = resolve_process(
            &["serve".to_string()],
            &ProcessOptions::default(),
            None,
            &image(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.arguments, vec!["/app", "serve"]);
        assert_eq!(process.executable, "/app");
    }

    #[test]
    fn test_image_cmd_appended_without_args() {
        let process = resolve_process(
            &[],
            &ProcessOptions::default(),
            None,
            &image(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.arguments, vec!["/app", "--help"]);
    }

    #[test]
    fn test_entrypoint_override_discards_cmd() {
        let process = resolve_process(
            &[],
            &ProcessOptions::default(),
            Some("/bin/sh"),
            &image(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.arguments, vec!["/bin/sh"]);
    }

    #[test]
    fn test_entrypoint_override_with_args() {
        let process = resolve_process(
            &["-c".to_string(), "ls".to_string()],
            &ProcessOptions::default(),
            Some("/bin/sh"),
            &image(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.arguments, vec!["/bin/sh", "-c", "ls"]);
    }

    #[test]
    fn test_empty_vector_rejected() {
        let err = resolve_process(
            &[],
            &ProcessOptions::default(),
            None,
            &ImageDefaults::default(),
            &no_lookup,
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidArgument(m) => {
                assert_eq!(m, "Command/Entrypoint not specified")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cwd_precedence() {
        let mut options = ProcessOptions::default();
        options.cwd = Some("/work".to_string());
        let process =
            resolve_process(&[], &options, None, &image(), &no_lookup).unwrap();
        assert_eq!(process.working_directory, "/work");

        let process = resolve_process(
            &[],
            &ProcessOptions::default(),
            None,
            &image(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.working_directory, "/srv");

        let process = resolve_process(
            &["ls".to_string()],
            &ProcessOptions::default(),
            None,
            &ImageDefaults::default(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.working_directory, "/");
    }

    #[test]
    fn test_image_user_becomes_default() {
        let process = resolve_process(
            &[],
            &ProcessOptions::default(),
            None,
            &image(),
            &no_lookup,
        )
        .unwrap();
        assert_eq!(process.user, ContainerUser::raw("nobody"));
    }

    #[test]
    fn test_environment_merged_from_image() {
        let mut options = ProcessOptions::default();
        options.env = vec!["EXTRA=1".to_string()];
        let process =
            resolve_process(&[], &options, None, &image(), &no_lookup).unwrap();
        assert_eq!(process.environment, vec!["PATH=/usr/bin", "EXTRA=1"]);
    }

    #[test]
    fn test_terminal_flag_copied() {
        let mut options = ProcessOptions::default();
        options.tty = true;
        let process =
            resolve_process(&[], &options, None, &image(), &no_lookup).unwrap();
        assert!(process.terminal);
    }
}
