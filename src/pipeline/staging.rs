//! Scoped temporary artifact holding the uploaded bytes.
//!
//! ## Why a named temp file?
//!
//! Converters dispatch on the file extension and need a real path, so the
//! upload is written to a `NamedTempFile` whose name keeps the original
//! extension. Removal is guaranteed on every exit path: [`StagedUpload::release`]
//! deletes it explicitly and reports failures, and if the request unwinds or is
//! cancelled first, `NamedTempFile`'s `Drop` removes it instead. `release`
//! consumes the value, so the file can only be released once.

use crate::error::DocmarkError;
use crate::upload::UploadedFile;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Prefix of every staged file name.
pub const TEMP_PREFIX: &str = "docmark-";

/// The upload, written to a uniquely named temporary file.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Write `upload` to a fresh temp file in `dir` (or the platform temp dir).
    pub fn create(upload: &UploadedFile, dir: Option<&Path>) -> Result<Self, DocmarkError> {
        let suffix = upload
            .raw_extension()
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(&suffix);

        let target = dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let mut file = match dir {
            Some(d) => builder.tempfile_in(d),
            None => builder.tempfile(),
        }
        .map_err(|e| DocmarkError::TempFile {
            path: target.clone(),
            source: e,
        })?;

        file.write_all(&upload.content)
            .and_then(|_| file.flush())
            .map_err(|e| DocmarkError::TempFile {
                path: file.path().to_path_buf(),
                source: e,
            })?;

        debug!(
            "Staged {} ({} bytes) at {}",
            upload.name,
            upload.size_bytes,
            file.path().display()
        );
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temp file now.
    pub fn release(self) -> Result<(), DocmarkError> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file.close().map_err(|e| DocmarkError::TempFile {
            path: path.clone(),
            source: e,
        })?;
        debug!("Released {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_file_keeps_extension_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let upload = UploadedFile::new("Slides.PPTX", "", b"deck".to_vec());
        let staged = StagedUpload::create(&upload, Some(dir.path())).unwrap();

        let path = staged.path().to_path_buf();
        assert_eq!(path.extension().unwrap(), "PPTX");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMP_PREFIX));
        assert_eq!(std::fs::read(&path).unwrap(), b"deck");

        staged.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn dropping_without_release_still_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = UploadedFile::new("a.txt", "", b"x".to_vec());
        let path = {
            let staged = StagedUpload::create(&upload, Some(dir.path())).unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_stagings_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let upload = UploadedFile::new("same.pdf", "", b"%PDF".to_vec());
        let a = StagedUpload::create(&upload, Some(dir.path())).unwrap();
        let b = StagedUpload::create(&upload, Some(dir.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_directory_is_temp_file_error() {
        let upload = UploadedFile::new("a.txt", "", b"x".to_vec());
        let err = StagedUpload::create(&upload, Some(Path::new("/definitely/not/here")))
            .unwrap_err();
        assert!(matches!(err, DocmarkError::TempFile { .. }));
    }
}
