//! Defines the event and message structures for communication between the backend and frontend.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::view_model::UiState;
use crate::core::FileId;

/// Severity of a notice shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Events sent from the Rust backend to the front end.
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// A blocking notice the user has to acknowledge.
    ShowNotice { level: NoticeLevel, message: String },
    /// The shareable location changed; push it without reloading the view.
    NavigationChanged(String),
    /// An error message to be displayed to the user.
    ShowError(String),
    /// Whether a configuration export succeeded.
    ConfigExported(bool),
}

/// A message received from the front end via the IPC channel.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Payload of `addFiles`: paths dropped onto the view.
#[derive(Deserialize, Debug)]
pub struct AddFilesPayload {
    pub paths: Vec<PathBuf>,
}

/// Payload of `removeFile`.
#[derive(Deserialize, Debug)]
pub struct RemoveFilePayload {
    pub id: FileId,
}
