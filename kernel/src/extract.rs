//! Pulling a single file out of a kernel tarball.

use crate::error::KernelError;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Lexically collapses `.` and `..` components and strips a leading `./`
/// so archive member paths compare reliably.
pub fn normalize_archive_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    normalized
}

/// Reads the archive entry at `entry_path`. When the entry is a symlink,
/// the archive is walked a second time for the link target, resolved
/// relative to the entry's directory.
pub fn extract_entry(archive_path: &Path, entry_path: &str) -> Result<Vec<u8>, KernelError> {
    let wanted = normalize_archive_path(Path::new(entry_path));

    match read_entry(archive_path, &wanted)? {
        Found::File(data) => Ok(data),
        Found::Symlink(target) => {
            let base = wanted.parent().unwrap_or(Path::new("")).join(target);
            let resolved = normalize_archive_path(&base);
            tracing::debug!(target = %resolved.display(), "following archive symlink");
            match read_entry(archive_path, &resolved)? {
                Found::File(data) => Ok(data),
                Found::Symlink(_) => Err(KernelError::Extraction(format!(
                    "archive entry {entry_path} is a chain of symlinks"
                ))),
            }
        }
    }
}

enum Found {
    File(Vec<u8>),
    Symlink(PathBuf),
}

fn read_entry(archive_path: &Path, wanted: &Path) -> Result<Found, KernelError> {
    let file = std::fs::File::open(archive_path)?;
    let mut magic = [0u8; 2];
    let gzipped = {
        use std::io::Seek;
        let mut file = file;
        let read = file.read(&mut magic)?;
        file.rewind()?;
        read == 2 && magic == GZIP_MAGIC
    };

    let file = std::fs::File::open(archive_path)?;
    if gzipped {
        scan_archive(Archive::new(GzDecoder::new(file)), wanted)
    } else {
        scan_archive(Archive::new(file), wanted)
    }
}

fn scan_archive<R: Read>(mut archive: Archive<R>, wanted: &Path) -> Result<Found, KernelError> {
    for entry in archive
        .entries()
        .map_err(|e| KernelError::Extraction(format!("reading archive: {e}")))?
    {
        let mut entry =
            entry.map_err(|e| KernelError::Extraction(format!("reading entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| KernelError::Extraction(format!("entry path: {e}")))?
            .into_owned();
        if normalize_archive_path(&path) != wanted {
            continue;
        }

        if entry.header().entry_type().is_symlink() {
            let target = entry
                .link_name()
                .map_err(|e| KernelError::Extraction(format!("link target: {e}")))?
                .ok_or_else(|| {
                    KernelError::Extraction(format!("symlink {} has no target", path.display()))
                })?;
            return Ok(Found::Symlink(target.into_owned()));
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| KernelError::Extraction(format!("reading {}: {e}", path.display())))?;
        return Ok(Found::File(data));
    }
    Err(KernelError::EntryNotFound(
        wanted.to_string_lossy().into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(
            normalize_archive_path(Path::new("./boot/../boot/vmlinux")),
            PathBuf::from("boot/vmlinux")
        );
        assert_eq!(
            normalize_archive_path(Path::new("a/./b")),
            PathBuf::from("a/b")
        );
    }

    fn build_archive(dir: &Path) -> PathBuf {
        let path = dir.join("kernel.tar");
        let file = std::fs::File::create(&path).unwrap();
        let mut builder = tar::Builder::new(file);

        let data = b"ELFKERNEL";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "boot/vmlinux-6.1", &data[..])
            .unwrap();

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_size(0);
        link.set_cksum();
        builder
            .append_link(&mut link, "boot/vmlinux", "vmlinux-6.1")
            .unwrap();

        builder.finish().unwrap();
        path
    }

    #[test]
    fn test_extracts_regular_entry() {
        let dir = TempDir::new().unwrap();
        let archive = build_archive(dir.path());
        let data = extract_entry(&archive, "boot/vmlinux-6.1").unwrap();
        assert_eq!(data, b"ELFKERNEL");
    }

    #[test]
    fn test_follows_symlink_entry() {
        let dir = TempDir::new().unwrap();
        let archive = build_archive(dir.path());
        let data = extract_entry(&archive, "./boot/vmlinux").unwrap();
        assert_eq!(data, b"ELFKERNEL");
    }

    #[test]
    fn test_missing_entry_reported() {
        let dir = TempDir::new().unwrap();
        let archive = build_archive(dir.path());
        let err = extract_entry(&archive, "boot/initrd").unwrap_err();
        assert!(matches!(err, KernelError::EntryNotFound(_)));
    }
}
