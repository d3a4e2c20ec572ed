pub mod dispatcher;
pub mod error;
pub mod inference;
pub mod preview;
pub mod registry;
pub mod session;
pub mod view_state;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::file_detection::{detect_media_type, is_image_media_type};

/// Opaque identifier of a selected file.
///
/// Built from the file name plus a random token, so two selections of the
/// same file name never share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn for_name(name: &str) -> Self {
        FileId(format!("{}-{}", name, uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        FileId(value)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        FileId(value.to_string())
    }
}

/// Descriptor of a file picked by the user. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawFile {
    name: String,
    path: PathBuf,
    media_type: String,
    size: u64,
}

impl RawFile {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        media_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            media_type: media_type.into(),
            size,
        }
    }

    /// Describes a file on disk, detecting its media type from the extension
    /// and, failing that, from its content.
    pub fn from_path(path: &Path) -> Result<Self, error::CoreError> {
        let metadata =
            std::fs::metadata(path).map_err(|e| error::CoreError::Io(e, path.to_path_buf()))?;
        if metadata.is_dir() {
            return Err(error::CoreError::Io(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
                path.to_path_buf(),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            path: path.to_path_buf(),
            media_type: detect_media_type(path),
            size: metadata.len(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_image(&self) -> bool {
        is_image_media_type(&self.media_type)
    }
}

/// Lifecycle status of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Analyzing,
    Completed,
    Error,
}

impl FileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Pending => "pending",
            FileStatus::Analyzing => "analyzing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// A requested status change, applied through `FileRegistry::transition`.
#[derive(Debug)]
pub enum Transition {
    /// `pending -> analyzing`
    Start,
    /// `completed | error -> analyzing`, dropping any previous result.
    Restart,
    /// `analyzing -> completed`
    Complete(inference::AnalysisResult),
    /// `analyzing -> error`
    Fail(String),
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Restart => "restart",
            Transition::Complete(_) => "complete",
            Transition::Fail(_) => "fail",
        }
    }
}

/// Local preview of a file, filled in asynchronously after selection.
#[derive(Debug)]
pub enum PreviewState {
    Loading,
    Ready(preview::PreviewHandle),
    Unavailable(String),
}

impl PreviewState {
    pub fn handle(&self) -> Option<&preview::PreviewHandle> {
        match self {
            PreviewState::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    fn release(self) {
        if let PreviewState::Ready(handle) = self {
            handle.release();
        }
    }
}

/// One user-selected file plus its derived preview, result, and status.
///
/// Fields are only mutated by `FileRegistry`, which keeps `result` populated
/// exactly while the status is `Completed`.
#[derive(Debug)]
pub struct FileItem {
    id: FileId,
    raw: RawFile,
    preview: PreviewState,
    result: Option<inference::AnalysisResult>,
    error: Option<String>,
    status: FileStatus,
    selected_at: DateTime<Utc>,
}

impl FileItem {
    fn new(raw: RawFile) -> Self {
        Self {
            id: FileId::for_name(raw.name()),
            raw,
            preview: PreviewState::Loading,
            result: None,
            error: None,
            status: FileStatus::Pending,
            selected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn raw(&self) -> &RawFile {
        &self.raw
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn result(&self) -> Option<&inference::AnalysisResult> {
        self.result.as_ref()
    }

    pub fn result_handle(&self) -> Option<&inference::ResultHandle> {
        self.result.as_ref().map(|r| &r.overlay)
    }

    pub fn detected_labels(&self) -> Option<&[String]> {
        self.result.as_ref().map(|r| r.detected_labels.as_slice())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_at(&self) -> DateTime<Utc> {
        self.selected_at
    }

    /// Releases the preview and result handles held by this item.
    fn release(self) {
        self.preview.release();
        if let Some(result) = self.result {
            result.overlay.release();
        }
    }
}

pub use dispatcher::{AnalysisDispatcher, AnalysisJob, DispatchReport};
pub use error::CoreError;
pub use inference::{AnalysisResult, HttpInferenceClient, InferenceClient, ResultHandle};
pub use preview::{PreviewGenerator, PreviewHandle};
pub use registry::FileRegistry;
pub use session::{EnvSessionStore, SessionStore, StaticSessionStore};
pub use view_state::{NavigationBoundary, QueryAnnotations, ViewStateSynchronizer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ids_differ_for_same_name() {
        let a = FileId::for_name("scan.png");
        let b = FileId::for_name("scan.png");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("scan.png-"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&FileStatus::Analyzing).unwrap();
        assert_eq!(json, "\"analyzing\"");
        assert!(FileStatus::Error.is_terminal());
        assert!(!FileStatus::Pending.is_terminal());
    }

    #[test]
    fn test_raw_file_from_path_detects_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eye.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let raw = RawFile::from_path(&path).unwrap();
        assert_eq!(raw.name(), "eye.jpg");
        assert_eq!(raw.media_type(), "image/jpeg");
        assert_eq!(raw.size(), 17);
        assert!(raw.is_image());
    }

    #[test]
    fn test_raw_file_from_missing_path_is_io_error() {
        let err = RawFile::from_path(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, error::CoreError::Io(_, _)));
    }
}
