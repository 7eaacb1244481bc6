//! Audio upload storage
//!
//! Uploaded recordings are written to disk for the speech-to-text client.
//! Each file lives exactly as long as its [`SavedUpload`] guard, so it is
//! removed when the step finishes, fails, or the request is dropped midway.

use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::ServerError;

const DEFAULT_NAME: &str = "audio";

/// Directory holding in-flight uploads
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

/// An upload on disk, deleted when dropped
#[derive(Debug)]
pub struct SavedUpload {
    path: TempPath,
}

impl SavedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete now, logging a failure instead of ignoring it
    pub fn discard(self) {
        let path = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            tracing::debug!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    }
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if missing
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write an upload as `{uuid}_{sanitized name}`
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<SavedUpload, ServerError> {
        let name = sanitize_file_name(original_name.unwrap_or(DEFAULT_NAME));
        let path = tempfile::Builder::new()
            .prefix(&format!("{}_", uuid::Uuid::new_v4()))
            .suffix(&name)
            .rand_bytes(0)
            .tempfile_in(&self.dir)
            .map_err(|e| ServerError::Upload(format!("{}: {}", self.dir.display(), e)))?
            .into_temp_path();

        // On failure the guard drops and takes the partial file with it
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServerError::Upload(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved upload");
        Ok(SavedUpload { path })
    }
}

/// Keep only the final path component and a safe character set
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
