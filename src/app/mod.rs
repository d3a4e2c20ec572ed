//! The application shell around the core: shared state, commands, and the
//! IPC bridge the view talks to.

pub mod commands;
pub mod events;
pub mod file_dialog;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod view_model;

use std::sync::{Arc, Mutex};

use self::events::{AddFilesPayload, IpcMessage, NoticeLevel, RemoveFilePayload, UserEvent};
use self::file_dialog::DialogService;
use self::proxy::EventProxy;
use self::state::AppState;
use crate::core::{CoreError, InferenceClient, SessionStore};

/// External collaborators a command may need.
#[derive(Clone)]
pub struct Services {
    pub inference: Arc<dyn InferenceClient>,
    pub session: Arc<dyn SessionStore>,
    pub dialog: Arc<dyn DialogService>,
}

/// Parses an IPC message from the view and routes it to its command.
///
/// Long-running work (previews, analysis) is spawned; this returns as soon as
/// the command has been accepted.
pub fn handle_ipc_message<P: EventProxy>(
    message: String,
    services: Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let msg: IpcMessage = match serde_json::from_str(&message) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::error!("Failed to parse IPC message: {}", e);
            proxy.send_event(UserEvent::ShowError(format!("Invalid message: {}", e)));
            return;
        }
    };

    tracing::debug!("IPC command: {}", msg.command);
    match msg.command.as_str() {
        "initialize" => commands::initialize(proxy, state),
        "selectFiles" => {
            let dialog = services.dialog.clone();
            tokio::task::spawn_blocking(move || {
                commands::select_files(dialog.as_ref(), proxy, state);
            });
        }
        "addFiles" => match serde_json::from_value::<AddFilesPayload>(msg.payload) {
            Ok(payload) => {
                commands::add_files(payload.paths, proxy, state);
            }
            Err(e) => send_payload_error(&proxy, "addFiles", e),
        },
        "removeFile" => match serde_json::from_value::<RemoveFilePayload>(msg.payload) {
            Ok(payload) => commands::remove_file(&payload.id, proxy, state),
            Err(e) => send_payload_error(&proxy, "removeFile", e),
        },
        "analyze" => {
            tokio::spawn(async move {
                match commands::analyze(proxy.clone(), state, services).await {
                    Ok(_) | Err(CoreError::NoFilesSelected) => {}
                    Err(CoreError::AnalysisInProgress) => proxy.send_event(UserEvent::ShowNotice {
                        level: NoticeLevel::Info,
                        message: "An analysis is already running.".to_string(),
                    }),
                    Err(e) => proxy.send_event(UserEvent::ShowError(e.to_string())),
                }
            });
        }
        "reset" => commands::reset(proxy, state),
        "importConfig" => {
            let dialog = services.dialog.clone();
            tokio::task::spawn_blocking(move || {
                commands::import_config(dialog.as_ref(), proxy, state);
            });
        }
        "exportConfig" => {
            let dialog = services.dialog.clone();
            tokio::task::spawn_blocking(move || {
                commands::export_config(dialog.as_ref(), proxy, state);
            });
        }
        other => tracing::warn!("Unknown IPC command: {}", other),
    }
}

fn send_payload_error<P: EventProxy>(proxy: &P, command: &str, error: serde_json::Error) {
    tracing::warn!("Invalid payload for {}: {}", command, error);
    proxy.send_event(UserEvent::ShowError(format!(
        "Invalid payload for {}: {}",
        command, error
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HttpInferenceClient, StaticSessionStore};
    use std::path::{Path, PathBuf};
    use tokio::sync::mpsc;
    use tracing_test::traced_test;

    /// Picks nothing for images; config dialogs return the stored path.
    #[derive(Default)]
    struct FixedDialog {
        config_file: Option<PathBuf>,
    }

    impl DialogService for FixedDialog {
        fn pick_images(&self, _start_directory: Option<&Path>) -> Vec<PathBuf> {
            Vec::new()
        }

        fn pick_config_to_import(&self) -> Option<PathBuf> {
            self.config_file.clone()
        }

        fn export_config_path(&self) -> Option<PathBuf> {
            self.config_file.clone()
        }
    }

    fn services_with(dialog: FixedDialog) -> Services {
        Services {
            inference: Arc::new(HttpInferenceClient::new("http://127.0.0.1:9/predict", None).unwrap()),
            session: Arc::new(StaticSessionStore::default()),
            dialog: Arc::new(dialog),
        }
    }

    fn services() -> Services {
        services_with(FixedDialog::default())
    }

    fn state() -> Arc<Mutex<AppState>> {
        Arc::new(Mutex::new(AppState::new(crate::config::AppConfig::default())))
    }

    #[test]
    #[traced_test]
    fn test_unknown_command_is_logged_and_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_ipc_message(
            r#"{"command":"selectFolder"}"#.to_string(),
            services(),
            tx,
            state(),
        );
        assert!(rx.try_recv().is_err());
        assert!(logs_contain("Unknown IPC command: selectFolder"));
    }

    #[test]
    fn test_missing_payload_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_ipc_message(r#"{"command":"addFiles"}"#.to_string(), services(), tx, state());
        match rx.try_recv() {
            Ok(UserEvent::ShowError(message)) => assert!(message.contains("addFiles")),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_reset_command_sends_state() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_ipc_message(r#"{"command":"reset"}"#.to_string(), services(), tx, state());
        assert!(matches!(rx.try_recv(), Ok(UserEvent::StateUpdate(_))));
    }

    #[tokio::test]
    async fn test_export_and_import_config_commands_are_routed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("shared.json");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = state();
        state.lock().unwrap().config_path = Some(dir.path().join("config.json"));
        state.lock().unwrap().config.page_path = "/analysis".to_string();

        let dialog = || FixedDialog {
            config_file: Some(file.clone()),
        };
        handle_ipc_message(
            r#"{"command":"exportConfig"}"#.to_string(),
            services_with(dialog()),
            tx.clone(),
            state.clone(),
        );
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(event, Some(UserEvent::ConfigExported(true))));

        state.lock().unwrap().config.page_path = "/uploadpage".to_string();
        handle_ipc_message(
            r#"{"command":"importConfig"}"#.to_string(),
            services_with(dialog()),
            tx,
            state.clone(),
        );
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(event, Some(UserEvent::StateUpdate(_))));
        assert_eq!(state.lock().unwrap().config.page_path, "/analysis");
    }
}
