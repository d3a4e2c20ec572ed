//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! This module acts as a presentation layer: one card per selected file with
//! its status, preview, and result, plus the labels and flags the view needs
//! to render its buttons.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::AppState;
use crate::core::{FileId, FileItem, FileStatus, PreviewState};

/// Label of the analyze button while a pass is running.
pub const ANALYZING_LABEL: &str = "Analyzing...";
/// Label of the analyze button when idle.
pub const ANALYZE_LABEL: &str = "Analyze Images";
/// Preview error shown when the preview copy has no file URL.
pub const PREVIEW_NOT_ADDRESSABLE: &str = "Preview location cannot be displayed";
/// Inline message shown under a file that failed.
pub const FAILED_ITEM_MESSAGE: &str = "Failed to process file";

/// A serializable representation of the application state for the UI.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub files: Vec<FileCard>,
    pub total_files: usize,
    pub completed_count: usize,
    pub error_count: usize,
    pub is_uploading: bool,
    pub has_result: bool,
    pub location: String,
    pub analyze_label: String,
    pub status_message: String,
}

/// A serializable representation of a single selected file.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileCard {
    pub id: FileId,
    pub name: String,
    pub size_label: String,
    pub media_type: String,
    pub status: FileStatus,
    pub preview_url: Option<String>,
    pub preview_error: Option<String>,
    pub result_url: Option<String>,
    pub detected_labels: Vec<String>,
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    pub selected_at: DateTime<Utc>,
}

impl FileCard {
    fn from_item(item: &FileItem) -> Self {
        let (preview_url, preview_error) = match item.preview() {
            PreviewState::Loading => (None, None),
            PreviewState::Ready(handle) => match handle.url() {
                Some(url) => (Some(url), None),
                None => (None, Some(PREVIEW_NOT_ADDRESSABLE.to_string())),
            },
            PreviewState::Unavailable(reason) => (None, Some(reason.clone())),
        };
        let is_error = item.status() == FileStatus::Error;

        FileCard {
            id: item.id().clone(),
            name: item.raw().name().to_string(),
            size_label: format_size(item.raw().size()),
            media_type: item.raw().media_type().to_string(),
            status: item.status(),
            preview_url,
            preview_error,
            result_url: item.result_handle().map(|r| r.to_data_url()),
            detected_labels: item
                .detected_labels()
                .map(|labels| labels.to_vec())
                .unwrap_or_default(),
            error_message: is_error.then(|| FAILED_ITEM_MESSAGE.to_string()),
            error_detail: item.error().map(str::to_string),
            selected_at: item.selected_at(),
        }
    }
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let files: Vec<FileCard> = state
        .registry
        .items()
        .iter()
        .map(FileCard::from_item)
        .collect();

    let counts = state.registry.count_by_status();
    let count = |status: FileStatus| counts.get(&status).copied().unwrap_or(0);
    let completed_count = count(FileStatus::Completed);
    let error_count = count(FileStatus::Error);

    let status_message = if state.is_uploading {
        format!("Analyzing {} file(s)...", files.len())
    } else if files.is_empty() {
        "Select images to analyze.".to_string()
    } else {
        format!(
            "{} selected: {} completed, {} failed, {} pending.",
            files.len(),
            completed_count,
            error_count,
            count(FileStatus::Pending)
        )
    };

    UiState {
        total_files: files.len(),
        files,
        completed_count,
        error_count,
        is_uploading: state.is_uploading,
        has_result: state.view.has_result(),
        location: state.view.location(),
        analyze_label: if state.is_uploading {
            ANALYZING_LABEL
        } else {
            ANALYZE_LABEL
        }
        .to_string(),
        status_message,
    }
}

/// Formats a byte count in megabytes with one decimal, e.g. `2.4 MB`.
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}
