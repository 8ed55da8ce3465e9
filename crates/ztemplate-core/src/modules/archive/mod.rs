mod codec;

pub use codec::{ARCHIVE_FORMAT_VERSION, ARCHIVE_MAGIC, decode_archive, encode_archive};

use super::serialization::write_binary_artifact;
use super::{ArchiveReader, ArchiveWriter};
use crate::domain::{TemplateArchive, TemplateError, TemplateResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Archive store rooted at an output directory; each archive is written under
/// its own `metadata.filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdArchiveFile {
    output_dir: PathBuf,
}

impl NdArchiveFile {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ArchiveWriter for NdArchiveFile {
    fn write_archive(&self, archive: &TemplateArchive) -> TemplateResult<PathBuf> {
        let path = self.output_dir.join(&archive.metadata().filename);
        write_archive(&path, archive)?;
        Ok(path)
    }
}

impl ArchiveReader for NdArchiveFile {
    fn read_archive(&self, path: &Path) -> TemplateResult<TemplateArchive> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        };
        read_archive(&path)
    }
}

pub fn write_archive(path: &Path, archive: &TemplateArchive) -> TemplateResult<()> {
    let bytes = encode_archive(archive)?;
    write_binary_artifact(path, &bytes).map_err(|source| {
        TemplateError::io_system(
            "IO.ARCHIVE_WRITE",
            format!("failed to write archive '{}': {}", path.display(), source),
        )
    })?;
    info!(
        path = %path.display(),
        shape = ?archive.flux().shape(),
        bytes = bytes.len(),
        "wrote template archive"
    );
    Ok(())
}

pub fn read_archive(path: &Path) -> TemplateResult<TemplateArchive> {
    let bytes = fs::read(path).map_err(|source| {
        TemplateError::io_system(
            "IO.ARCHIVE_READ",
            format!("failed to read archive '{}': {}", path.display(), source),
        )
    })?;
    decode_archive(&bytes).map_err(|error| {
        TemplateError::new(
            error.category(),
            error.placeholder(),
            format!("{} ({})", error.message(), path.display()),
        )
    })
}
