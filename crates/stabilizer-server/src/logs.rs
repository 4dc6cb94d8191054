//! Build-log archive.
//!
//! Logs submitted by workers are written under a single directory. The
//! client picks the file name, so anything that could escape the directory
//! is refused.

use std::path::{Path, PathBuf};

use crate::error::ApiError;

/// Directory that receives submitted build logs.
#[derive(Debug, Clone)]
pub struct LogArchive {
    dir: PathBuf,
}

impl LogArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LogArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checks that `filename` names a plain file inside the archive.
    pub fn validate(filename: &str) -> Result<(), ApiError> {
        if filename.trim().is_empty() {
            return Err(ApiError::BadRequest("log filename is empty".to_string()));
        }
        if filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
            || filename.contains('\0')
        {
            return Err(ApiError::BadRequest(format!(
                "log filename '{filename}' must not contain path separators or '..'"
            )));
        }
        Ok(())
    }

    /// Writes `contents` to `<dir>/<filename>`, replacing any earlier file.
    pub async fn store(&self, filename: &str, contents: &[u8]) -> Result<PathBuf, ApiError> {
        Self::validate(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }
}
