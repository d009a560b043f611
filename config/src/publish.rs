//! `--publish-port` and `--publish-socket` parsing.

use crate::error::ConfigError;
use berth_core::{PortProtocol, PublishPort, PublishSocket};
use std::path::PathBuf;

/// Parses `[host-ip:]host-port:container-port[/protocol]`.
pub fn parse_publish_port(input: &str) -> Result<PublishPort, ConfigError> {
    let slash: Vec<&str> = input.split('/').collect();
    let (address_part, protocol) = match slash.len() {
        1 => (slash[0], PortProtocol::Tcp),
        2 => {
            let protocol = slash[1]
                .parse::<PortProtocol>()
                .map_err(ConfigError::InvalidArgument)?;
            (slash[0], protocol)
        }
        _ => {
            return Err(ConfigError::InvalidArgument(format!(
                "invalid port specification: {input}"
            )))
        }
    };

    let parts: Vec<&str> = address_part.split(':').collect();
    let (host_address, host_port, container_port) = match parts.len() {
        2 => ("0.0.0.0", parts[0], parts[1]),
        3 => (parts[0], parts[1], parts[2]),
        _ => {
            return Err(ConfigError::InvalidArgument(format!(
                "invalid port specification: {input}"
            )))
        }
    };

    let parse_port = |value: &str| {
        value.parse::<u16>().map_err(|_| {
            ConfigError::InvalidArgument(format!("invalid port number: {value}"))
        })
    };

    Ok(PublishPort {
        host_address: host_address.to_string(),
        host_port: parse_port(host_port)?,
        container_port: parse_port(container_port)?,
        protocol,
    })
}

/// Parses `host_path:container_path` and prepares the host side.
///
/// This performs filesystem mutations at parse time: a preexisting socket
/// at the host path aborts, any other preexisting file is removed, and
/// missing parent directories are created. Callers that want a dry run
/// must not invoke this parser.
pub fn parse_publish_socket(input: &str) -> Result<PublishSocket, ConfigError> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::InvalidArgument(format!(
            "invalid socket specification: {input}"
        )));
    }
    let (host, container) = (parts[0], parts[1]);

    if !container.starts_with('/') {
        return Err(ConfigError::InvalidArgument(format!(
            "container socket path is not absolute: {container}"
        )));
    }

    let host_path = PathBuf::from(host);
    let host_path = if host_path.is_absolute() {
        host_path
    } else {
        std::env::current_dir()?.join(host_path)
    };

    prepare_host_socket_path(&host_path)?;

    Ok(PublishSocket {
        host_path,
        container_path: container.to_string(),
        permissions: None,
    })
}

fn prepare_host_socket_path(path: &std::path::Path) -> Result<(), ConfigError> {
    if let Ok(metadata) = std::fs::symlink_metadata(path) {
        use std::os::unix::fs::FileTypeExt;
        if metadata.file_type().is_socket() {
            return Err(ConfigError::Conflict(format!(
                "socket {} already exists and may be in use",
                path.display()
            )));
        }
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_with_address_and_protocol() {
        let p = parse_publish_port("127.0.0.1:8080:80/udp").unwrap();
        assert_eq!(p.host_address, "127.0.0.1");
        assert_eq!(p.host_port, 8080);
        assert_eq!(p.container_port, 80);
        assert_eq!(p.protocol, PortProtocol::Udp);
    }

    #[test]
    fn test_port_defaults() {
        let p = parse_publish_port("8080:80").unwrap();
        assert_eq!(p.host_address, "0.0.0.0");
        assert_eq!(p.protocol, PortProtocol::Tcp);
    }

    #[test]
    fn test_port_bad_shapes() {
        assert!(parse_publish_port("80").is_err());
        assert!(parse_publish_port("a:b:c:d").is_err());
        assert!(parse_publish_port("8080:80/icmp").is_err());
        assert!(parse_publish_port("8080:80/tcp/x").is_err());
        assert!(parse_publish_port("notaport:80").is_err());
        assert!(parse_publish_port("99999:80").is_err());
    }

    #[test]
    fn test_socket_requires_absolute_container_path() {
        let err = parse_publish_socket("/tmp/x.sock:var/run/y.sock").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn test_socket_rejects_empty_sides() {
        assert!(parse_publish_socket(":/y.sock").is_err());
        assert!(parse_publish_socket("/x.sock:").is_err());
        assert!(parse_publish_socket("/only").is_err());
    }

    #[test]
    fn test_socket_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let host = dir.path().join("nested/deeper/app.sock");
        let spec = format!("{}:/run/app.sock", host.display());
        let socket = parse_publish_socket(&spec).unwrap();
        assert_eq!(socket.host_path, host);
        assert!(host.parent().unwrap().is_dir());
        assert_eq!(socket.container_path, "/run/app.sock");
    }

    #[test]
    fn test_socket_removes_stale_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let host = dir.path().join("app.sock");
        std::fs::write(&host, b"stale").unwrap();
        let spec = format!("{}:/run/app.sock", host.display());
        parse_publish_socket(&spec).unwrap();
        assert!(!host.exists());
    }

    #[test]
    fn test_socket_conflicts_with_live_socket() {
        let dir = tempfile::tempdir().unwrap();
        let host = dir.path().join("app.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&host).unwrap();
        let spec = format!("{}:/run/app.sock", host.display());
        let err = parse_publish_socket(&spec).unwrap_err();
        match err {
            ConfigError::Conflict(m) => assert!(m.contains("already exists")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
