use crate::error::StoreError;
use crate::unpack::extract_layer;
use sha2::{Digest as Sha2Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

const BLOBS_DIR: &str = "blobs";
const MANIFESTS_DIR: &str = "manifests";
const TAGS_DIR: &str = "tags";
const ROOTFS_DIR: &str = "rootfs";

/// A `sha256:<hex>` content digest, validated before it ever becomes part
/// of a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    pub algorithm: String,
    pub hash: String,
}

impl Digest {
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let (algorithm, hash) = input
            .split_once(':')
            .ok_or_else(|| StoreError::InvalidDigest(input.to_string()))?;
        if algorithm != "sha256" {
            return Err(StoreError::InvalidDigest(input.to_string()));
        }
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidDigest(input.to_string()));
        }
        Ok(Self {
            algorithm: algorithm.to_string(),
            hash: hash.to_lowercase(),
        })
    }

    pub fn of(data: &[u8]) -> Self {
        Self {
            algorithm: "sha256".to_string(),
            hash: hex::encode(Sha256::digest(data)),
        }
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hash)
    }
}

/// Filesystem layout under one root:
///
/// ```text
/// <root>/blobs/sha256/<hash>
/// <root>/manifests/sha256/<hash>
/// <root>/tags/<repository>/<tag>
/// <root>/rootfs/<hash>/
/// ```
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        for dir in [BLOBS_DIR, MANIFESTS_DIR, TAGS_DIR, ROOTFS_DIR] {
            fs::create_dir_all(root.join(dir)).await?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join(BLOBS_DIR)
            .join(&digest.algorithm)
            .join(&digest.hash)
    }

    fn manifest_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join(MANIFESTS_DIR)
            .join(&digest.algorithm)
            .join(&digest.hash)
    }

    fn tag_path(&self, repository: &str, tag: &str) -> PathBuf {
        self.root.join(TAGS_DIR).join(repository).join(tag)
    }

    fn rootfs_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(ROOTFS_DIR).join(&digest.hash)
    }

    pub async fn has_blob(&self, digest: &Digest) -> bool {
        self.blob_path(digest).exists()
    }

    pub async fn get_blob(&self, digest: &Digest) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(digest);
        fs::read(&path)
            .await
            .map_err(|_| StoreError::BlobNotFound(digest.to_string()))
    }

    /// Stores a blob under its computed digest, verifying the expected
    /// digest when given. The write is staged and renamed so a crash never
    /// leaves a half-written blob under its final name.
    pub async fn put_blob(
        &self,
        data: &[u8],
        expected: Option<&Digest>,
    ) -> Result<Digest, StoreError> {
        let digest = Digest::of(data);
        if let Some(expected) = expected {
            if expected.hash != digest.hash {
                return Err(StoreError::DigestMismatch {
                    expected: expected.to_string(),
                    computed: digest.to_string(),
                });
            }
        }

        let path = self.blob_path(&digest);
        if path.exists() {
            return Ok(digest);
        }
        write_atomically(&path, data).await?;
        Ok(digest)
    }

    pub async fn put_manifest(&self, data: &[u8]) -> Result<Digest, StoreError> {
        let digest = Digest::of(data);
        let path = self.manifest_path(&digest);
        if !path.exists() {
            write_atomically(&path, data).await?;
        }
        Ok(digest)
    }

    pub async fn get_manifest(&self, digest: &Digest) -> Result<Vec<u8>, StoreError> {
        fs::read(self.manifest_path(digest))
            .await
            .map_err(|_| StoreError::ManifestNotFound(digest.to_string()))
    }

    /// Points `repository:tag` at a manifest digest.
    pub async fn set_tag(
        &self,
        repository: &str,
        tag: &str,
        digest: &Digest,
    ) -> Result<(), StoreError> {
        let path = self.tag_path(repository, tag);
        write_atomically(&path, digest.to_string().as_bytes()).await
    }

    pub async fn get_tag(&self, repository: &str, tag: &str) -> Result<Digest, StoreError> {
        let contents = fs::read_to_string(self.tag_path(repository, tag))
            .await
            .map_err(|_| StoreError::ImageNotFound(format!("{repository}:{tag}")))?;
        Digest::parse(contents.trim())
    }

    pub fn rootfs_dir(&self, digest: &Digest) -> PathBuf {
        self.rootfs_path(digest)
    }

    pub async fn has_rootfs(&self, digest: &Digest) -> bool {
        self.rootfs_path(digest).exists()
    }

    /// Builds the merged root filesystem for a manifest by extracting the
    /// given layer blobs in order. Extraction happens in a staging
    /// directory renamed into place on success, so a failed unpack leaves
    /// no partial rootfs behind.
    pub async fn unpack_rootfs(
        &self,
        digest: &Digest,
        layers: &[Vec<u8>],
    ) -> Result<PathBuf, StoreError> {
        let target = self.rootfs_path(digest);
        if target.exists() {
            return Ok(target);
        }

        let staging = self
            .root
            .join(ROOTFS_DIR)
            .join(format!(".{}.tmp", digest.hash));
        if staging.exists() {
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir_all(&staging).await?;

        for (index, layer) in layers.iter().enumerate() {
            tracing::debug!(layer = index, "extracting layer");
            if let Err(e) = extract_layer(layer, &staging) {
                let _ = fs::remove_dir_all(&staging).await;
                return Err(e);
            }
        }

        fs::rename(&staging, &target).await?;
        Ok(target)
    }
}

async fn write_atomically(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::Io(std::io::Error::other("path has no parent")))?;
    fs::create_dir_all(parent).await?;
    let staging = path.with_extension("tmp");
    fs::write(&staging, data).await?;
    fs::rename(&staging, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        let digest = store.put_blob(b"hello", None).await.unwrap();
        assert!(store.has_blob(&digest).await);
        assert_eq!(store.get_blob(&digest).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_put_blob_verifies_expected_digest() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        let wrong = Digest::parse(
            "sha256:0000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        let err = store.put_blob(b"hello", Some(&wrong)).await.unwrap_err();
        assert!(matches!(err, StoreError::DigestMismatch { .. }));
    }

    #[tokio::test]
    async fn test_tags_resolve_to_manifests() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        let digest = store.put_manifest(b"{\"layers\":[]}").await.unwrap();
        store.set_tag("library/alpine", "latest", &digest).await.unwrap();

        let resolved = store.get_tag("library/alpine", "latest").await.unwrap();
        assert_eq!(resolved, digest);
        assert_eq!(
            store.get_manifest(&resolved).await.unwrap(),
            b"{\"layers\":[]}"
        );
    }

    #[tokio::test]
    async fn test_missing_tag_is_image_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();
        let err = store.get_tag("library/alpine", "missing").await.unwrap_err();
        assert!(matches!(err, StoreError::ImageNotFound(_)));
    }

    #[test]
    fn test_digest_validation() {
        assert!(Digest::parse("sha256:abc123").is_ok());
        assert!(Digest::parse("sha256:").is_err());
        assert!(Digest::parse("md5:abc").is_err());
        assert!(Digest::parse("sha256:../etc/passwd").is_err());
        assert!(Digest::parse("bare").is_err());
    }
}
