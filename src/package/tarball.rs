//! Tarball construction for npm packages
//!
//! Packs a directory into a gzip'd tar with every entry under `package/`,
//! the layout npm registries expect. Entries are added in sorted order with
//! deterministic headers so the same tree always yields the same bytes.

use crate::core::config_loader::CONFIG_FILENAME;
use crate::core::error::PublishError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory every entry is nested under inside the archive
pub const PACKAGE_PREFIX: &str = "package";

/// Directories never packed, at any depth
const IGNORED_DIRS: &[&str] = &[".git"];

/// Files never packed from the source root; both may hold registry tokens
const IGNORED_ROOT_FILES: &[&str] = &[CONFIG_FILENAME, ".npmrc"];

/// An in-memory package tarball
///
/// Not `Clone`: a tarball is built once and consumed once.
#[derive(Debug)]
pub struct Tarball {
    data: Vec<u8>,
    entries: Vec<String>,
    unpacked_size: u64,
    shasum: String,
    integrity: String,
}

/// Reporting view of a tarball
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TarballSummary {
    pub size: usize,
    pub unpacked_size: u64,
    pub entry_count: usize,
    pub entries: Vec<String>,
    pub shasum: String,
    pub integrity: String,
}

impl Tarball {
    fn from_bytes(data: Vec<u8>, entries: Vec<String>, unpacked_size: u64) -> Self {
        let shasum = format!("{:x}", Sha1::digest(&data));
        let integrity = format!("sha512-{}", BASE64.encode(Sha512::digest(&data)));

        Self {
            data,
            entries,
            unpacked_size,
            shasum,
            integrity,
        }
    }

    /// Compressed bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the compressed bytes, consuming the tarball
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Archive paths of the packed files, e.g. `package/index.js`
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// SHA-1 hex digest of the compressed bytes
    pub fn shasum(&self) -> &str {
        &self.shasum
    }

    /// Subresource-integrity string (`sha512-<base64>`)
    pub fn integrity(&self) -> &str {
        &self.integrity
    }

    pub fn summary(&self) -> TarballSummary {
        TarballSummary {
            size: self.data.len(),
            unpacked_size: self.unpacked_size,
            entry_count: self.entries.len(),
            entries: self.entries.clone(),
            shasum: self.shasum.clone(),
            integrity: self.integrity.clone(),
        }
    }

    /// Write the tarball to `path`
    pub async fn write_to(&self, path: &Path) -> Result<(), PublishError> {
        fs::write(path, &self.data)
            .await
            .map_err(|e| PublishError::ArchiveFailed {
                message: format!("{}: {}", path.display(), e),
            })
    }
}

/// Pack `source_dir` into a tarball
///
/// # Errors
///
/// Returns [`PublishError::SourceDirNotFound`] if `source_dir` is missing or
/// not a directory, and [`PublishError::ArchiveFailed`] on read errors.
pub async fn pack_directory(source_dir: &Path) -> Result<Tarball, PublishError> {
    match fs::metadata(source_dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            return Err(PublishError::SourceDirNotFound {
                path: source_dir.to_path_buf(),
            });
        }
    }

    let dir = source_dir.to_path_buf();
    let tarball = tokio::task::spawn_blocking(move || build_tarball(&dir))
        .await
        .map_err(|e| PublishError::ArchiveFailed {
            message: format!("packing task failed: {}", e),
        })??;

    debug!(
        "packed {} files from {} ({} bytes)",
        tarball.entries.len(),
        source_dir.display(),
        tarball.data.len()
    );
    Ok(tarball)
}

fn archive_error(path: &Path, e: impl std::fmt::Display) -> PublishError {
    PublishError::ArchiveFailed {
        message: format!("{}: {}", path.display(), e),
    }
}

fn build_tarball(source_dir: &Path) -> Result<Tarball, PublishError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);

    let mut entries = Vec::new();
    let mut unpacked_size = 0u64;

    let walker = WalkDir::new(source_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry));

    for entry in walker {
        let entry = entry.map_err(|e| archive_error(source_dir, e))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| archive_error(entry.path(), e))?;
        let archive_path = archive_path(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            builder
                .append_dir(&archive_path, entry.path())
                .map_err(|e| archive_error(entry.path(), e))?;
        } else if file_type.is_file() {
            let size = entry
                .metadata()
                .map_err(|e| archive_error(entry.path(), e))?
                .len();
            builder
                .append_path_with_name(entry.path(), &archive_path)
                .map_err(|e| archive_error(entry.path(), e))?;
            unpacked_size += size;
            entries.push(archive_path.to_string_lossy().replace('\\', "/"));
        } else {
            warn!("skipping non-regular file {}", entry.path().display());
        }
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| archive_error(source_dir, e))?;
    let data = encoder.finish().map_err(|e| archive_error(source_dir, e))?;

    Ok(Tarball::from_bytes(data, entries, unpacked_size))
}

fn is_ignored(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let ignored = if entry.file_type().is_dir() {
        IGNORED_DIRS.contains(&name.as_ref())
    } else {
        entry.depth() == 1 && IGNORED_ROOT_FILES.contains(&name.as_ref())
    };
    if ignored {
        debug!("not packing {}", entry.path().display());
    }
    ignored
}

fn archive_path(relative: &Path) -> PathBuf {
    Path::new(PACKAGE_PREFIX).join(relative)
}
