//! OCI layer extraction into a merged directory.

use crate::error::StoreError;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tar::Archive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extracts one layer tarball (gzipped or plain) into `target`, applying
/// OCI whiteouts so files removed in upper layers disappear from the
/// merged tree.
pub fn extract_layer(layer: &[u8], target: &Path) -> Result<(), StoreError> {
    if layer.starts_with(&GZIP_MAGIC) {
        extract_entries(Archive::new(GzDecoder::new(layer)), target)
    } else {
        extract_entries(Archive::new(layer), target)
    }
}

fn extract_entries<R: Read>(mut archive: Archive<R>, target: &Path) -> Result<(), StoreError> {
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    for entry in archive
        .entries()
        .map_err(|e| StoreError::Extraction(format!("reading archive: {e}")))?
    {
        let mut entry =
            entry.map_err(|e| StoreError::Extraction(format!("reading entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| StoreError::Extraction(format!("entry path: {e}")))?
            .into_owned();

        if let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) {
            // Opaque marker: the directory's lower-layer contents go away.
            if name == ".wh..wh..opq" {
                let dir = target.join(path.parent().unwrap_or(Path::new("")));
                if dir.is_dir() {
                    clear_directory(&dir)?;
                }
                continue;
            }
            // Whiteout: the named sibling was deleted in this layer.
            if let Some(deleted) = name.strip_prefix(".wh.") {
                let victim = target
                    .join(path.parent().unwrap_or(Path::new("")))
                    .join(deleted);
                if victim.is_dir() {
                    std::fs::remove_dir_all(&victim)?;
                } else if victim.exists() {
                    std::fs::remove_file(&victim)?;
                }
                continue;
            }
        }

        entry
            .unpack_in(target)
            .map_err(|e| StoreError::Extraction(format!("unpacking {}: {e}", path.display())))?;
    }
    Ok(())
}

fn clear_directory(dir: &Path) -> Result<(), StoreError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_extract_plain_tar() {
        let dir = TempDir::new().unwrap();
        let tarball = tar_with(&[("etc/motd", b"hi")]);
        extract_layer(&tarball, dir.path()).unwrap();
        assert_eq!(std::fs::read(dir.path().join("etc/motd")).unwrap(), b"hi");
    }

    #[test]
    fn test_extract_gzipped_tar() {
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = TempDir::new().unwrap();
        let tarball = tar_with(&[("hello.txt", b"world")]);
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(&tarball).unwrap();
        let gzipped = encoder.finish().unwrap();

        extract_layer(&gzipped, dir.path()).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("hello.txt")).unwrap(),
            b"world"
        );
    }

    #[test]
    fn test_whiteout_removes_lower_file() {
        let dir = TempDir::new().unwrap();
        extract_layer(&tar_with(&[("app/config", b"old")]), dir.path()).unwrap();
        extract_layer(&tar_with(&[("app/.wh.config", b"")]), dir.path()).unwrap();
        assert!(!dir.path().join("app/config").exists());
    }

    #[test]
    fn test_opaque_whiteout_clears_directory() {
        let dir = TempDir::new().unwrap();
        extract_layer(
            &tar_with(&[("cache/a", b"1"), ("cache/b", b"2")]),
            dir.path(),
        )
        .unwrap();
        extract_layer(&tar_with(&[("cache/.wh..wh..opq", b"")]), dir.path()).unwrap();
        let remaining: Vec<_> = std::fs::read_dir(dir.path().join("cache"))
            .unwrap()
            .collect();
        assert!(remaining.is_empty());
    }
}
