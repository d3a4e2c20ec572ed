//! Local previews of selected files.
//!
//! A preview is a private temporary copy of the file's bytes. It can be
//! rendered without touching the network, and it is deleted as soon as its
//! item leaves the registry.

use std::path::{Path, PathBuf};
use tempfile::TempPath;
use url::Url;

use super::error::CoreError;
use super::RawFile;

/// File-backed preview owned by exactly one `FileItem`.
#[derive(Debug)]
pub struct PreviewHandle {
    path: TempPath,
    media_type: String,
}

impl PreviewHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// A percent-encoded `file://` URL pointing at the preview copy.
    ///
    /// `None` if the path cannot be expressed as a file URL (not absolute).
    pub fn url(&self) -> Option<String> {
        match Url::from_file_path(self.path()) {
            Ok(url) => Some(url.into()),
            Err(()) => {
                tracing::debug!("No file URL for preview {}", self.path.display());
                None
            }
        }
    }

    /// Deletes the backing file.
    pub fn release(self) {
        let shown = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            tracing::warn!("Failed to remove preview {}: {}", shown, e);
        } else {
            tracing::trace!("Released preview {}", shown);
        }
    }
}

/// Creates previews inside a fixed directory.
#[derive(Debug, Clone)]
pub struct PreviewGenerator {
    directory: PathBuf,
}

impl Default for PreviewGenerator {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl PreviewGenerator {
    /// Previews are written below `directory`, made absolute against the
    /// current directory so every preview has a file URL.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        Self {
            directory: std::path::absolute(&directory).unwrap_or(directory),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Copies the file's bytes into a fresh temporary preview.
    ///
    /// Reading may suspend; the handle is only usable once this resolves.
    pub async fn make_preview(&self, raw: &RawFile) -> Result<PreviewHandle, CoreError> {
        let unavailable = |source: std::io::Error| CoreError::PreviewUnavailable {
            path: raw.path().to_path_buf(),
            source,
        };

        let bytes = tokio::fs::read(raw.path()).await.map_err(unavailable)?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(unavailable)?;

        let suffix = raw
            .path()
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let directory = self.directory.clone();
        let temp_path = tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix("preview-")
                .suffix(&suffix)
                .tempfile_in(&directory)?;
            std::io::Write::write_all(&mut file, &bytes)?;
            Ok(file.into_temp_path())
        })
        .await?
        .map_err(unavailable)?;

        Ok(PreviewHandle {
            path: temp_path,
            media_type: raw.media_type().to_string(),
        })
    }
}
