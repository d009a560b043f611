use crate::error::RegistryError;

pub const DEFAULT_REGISTRY: &str = "registry-1.docker.io";

/// A parsed image reference: `[registry/]repository[:tag][@digest]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryError::InvalidReference("empty reference".into()));
        }

        let (rest, digest) = match input.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (input, None),
        };

        let (rest, tag) = if digest.is_none() {
            match rest.rsplit_once(':') {
                // A colon inside the registry host (port) contains a slash
                // to its right; a tag never does.
                Some((name, tag)) if !tag.contains('/') => (name, Some(tag.to_string())),
                _ => (rest, None),
            }
        } else {
            (rest, None)
        };

        let (registry, repository) = match rest.split_once('/') {
            Some((host, path)) if looks_like_registry(host) => {
                (host.to_string(), path.to_string())
            }
            Some(_) => (DEFAULT_REGISTRY.to_string(), rest.to_string()),
            None => (DEFAULT_REGISTRY.to_string(), format!("library/{rest}")),
        };

        if repository.is_empty() {
            return Err(RegistryError::InvalidReference(input.to_string()));
        }

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Tag or digest to request from the registry; `latest` when neither
    /// was given.
    pub fn locator(&self) -> &str {
        if let Some(digest) = &self.digest {
            digest
        } else {
            self.tag.as_deref().unwrap_or("latest")
        }
    }

    pub fn tag_or_default(&self) -> &str {
        self.tag.as_deref().unwrap_or("latest")
    }
}

fn looks_like_registry(host: &str) -> bool {
    host == "localhost" || host.contains('.') || host.contains(':')
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let repository = if self.registry == DEFAULT_REGISTRY {
            self.repository
                .strip_prefix("library/")
                .unwrap_or(&self.repository)
                .to_string()
        } else {
            format!("{}/{}", self.registry, self.repository)
        };
        match &self.digest {
            Some(digest) => write!(f, "{repository}@{digest}"),
            None => write!(f, "{repository}:{}", self.tag_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_gets_library_namespace() {
        let r = ImageReference::parse("alpine").unwrap();
        assert_eq!(r.registry, DEFAULT_REGISTRY);
        assert_eq!(r.repository, "library/alpine");
        assert_eq!(r.locator(), "latest");
    }

    #[test]
    fn test_tag_parsed() {
        let r = ImageReference::parse("alpine:3.20").unwrap();
        assert_eq!(r.tag.as_deref(), Some("3.20"));
    }

    #[test]
    fn test_namespaced_repository() {
        let r = ImageReference::parse("someone/app:v1").unwrap();
        assert_eq!(r.registry, DEFAULT_REGISTRY);
        assert_eq!(r.repository, "someone/app");
    }

    #[test]
    fn test_custom_registry() {
        let r = ImageReference::parse("ghcr.io/owner/repo:edge").unwrap();
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "owner/repo");
    }

    #[test]
    fn test_registry_with_port() {
        let r = ImageReference::parse("localhost:5000/app").unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "app");
        assert_eq!(r.locator(), "latest");
    }

    #[test]
    fn test_digest_reference() {
        let r = ImageReference::parse("alpine@sha256:abcd").unwrap();
        assert_eq!(r.digest.as_deref(), Some("sha256:abcd"));
        assert_eq!(r.locator(), "sha256:abcd");
    }

    #[test]
    fn test_display_round_trip() {
        let r = ImageReference::parse("ghcr.io/owner/repo:edge").unwrap();
        assert_eq!(r.to_string(), "ghcr.io/owner/repo:edge");
        let r = ImageReference::parse("alpine").unwrap();
        assert_eq!(r.to_string(), "alpine:latest");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(ImageReference::parse("").is_err());
        assert!(ImageReference::parse("  ").is_err());
    }
}
