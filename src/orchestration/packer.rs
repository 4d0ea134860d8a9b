//! Local packing, the `npm pack` counterpart of [`Publisher`](super::Publisher)

use crate::core::error::PublishError;
use crate::package::{PackageMetadata, TarballSummary, pack_directory};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Result of writing a tarball to disk
#[derive(Debug, Clone)]
pub struct PackOutput {
    pub archive_path: PathBuf,
    pub package_name: String,
    pub version: String,
    pub tarball: TarballSummary,
}

/// Pack `source_dir` and write `<name>-<version>.tgz` into `out_dir`
///
/// Metadata is checked first, exactly as a publish would, so a tarball that
/// packs here is one the publisher would accept.
pub async fn pack_to_directory(
    metadata_path: &Path,
    source_dir: &Path,
    out_dir: &Path,
) -> Result<PackOutput, PublishError> {
    let metadata = PackageMetadata::load(metadata_path).await?;
    let tarball = pack_directory(source_dir).await?;

    fs::create_dir_all(out_dir)
        .await
        .map_err(|e| PublishError::ArchiveFailed {
            message: format!("{}: {}", out_dir.display(), e),
        })?;

    let archive_path = out_dir.join(metadata.pack_file_name());
    tarball.write_to(&archive_path).await?;
    info!("wrote {}", archive_path.display());

    Ok(PackOutput {
        archive_path,
        package_name: metadata.name().to_string(),
        version: metadata.version().to_string(),
        tarball: tarball.summary(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_pack_to_directory() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::fs::write(
            source.path().join("package.json"),
            r#"{"name":"@couchmate/server","version":"0.4.0"}"#,
        )
        .unwrap();
        std::fs::write(source.path().join("index.js"), "x").unwrap();

        let output = pack_to_directory(
            &source.path().join("package.json"),
            source.path(),
            &out.path().join("dist"),
        )
        .await
        .unwrap();

        assert_eq!(
            output.archive_path,
            out.path().join("dist/couchmate-server-0.4.0.tgz")
        );
        assert!(output.archive_path.exists());
        assert_eq!(output.tarball.entry_count, 2);
        assert_eq!(output.package_name, "@couchmate/server");
    }

    #[tokio::test]
    async fn test_pack_requires_metadata() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let result =
            pack_to_directory(&source.path().join("package.json"), source.path(), out.path())
                .await;

        assert!(matches!(result, Err(PublishError::MetadataNotFound { .. })));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
