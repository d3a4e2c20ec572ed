//! Contains all the command handlers that are callable from the frontend via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`.
//! These handlers are responsible for interacting with the `AppState` and the `core`
//! logic, and for sending `UserEvent`s back to the UI.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::events::{NoticeLevel, UserEvent};
use super::file_dialog::DialogService;
use super::helpers::{lock_state, notify_state, with_state_and_notify};
use super::proxy::EventProxy;
use super::state::AppState;
use super::tasks::{run_analysis, start_preview_generation};
use super::view_model::generate_ui_state;
use super::Services;
use crate::config;
use crate::core::{CoreError, DispatchReport, FileId, RawFile};

/// Sends the current state so a freshly loaded view can render.
pub fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    notify_state(&state, &proxy);
}

/// Opens the native picker and adds whatever the user chose.
///
/// The directory of the first pick is remembered for the next dialog.
pub fn select_files<P: EventProxy, D: DialogService + ?Sized>(
    dialog: &D,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Vec<JoinHandle<()>> {
    let start_directory = lock_state(&state).config.last_directory.clone();
    let paths = dialog.pick_images(start_directory.as_deref());
    if paths.is_empty() {
        tracing::info!("User cancelled file selection");
        notify_state(&state, &proxy);
        return Vec::new();
    }

    if let Some(parent) = paths[0].parent() {
        let mut state_guard = lock_state(&state);
        state_guard.config.last_directory = Some(parent.to_path_buf());
        state_guard.persist_config();
    }

    add_files(paths, proxy, state)
}

/// Adds files by path, as a drop onto the view would.
///
/// Paths that cannot be read are logged and skipped, and non-image files are
/// dropped by the registry. A preview task is started for every new item.
pub fn add_files<P: EventProxy>(
    paths: Vec<PathBuf>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Vec<JoinHandle<()>> {
    let raws: Vec<RawFile> = paths
        .iter()
        .filter_map(|path| match RawFile::from_path(path) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    let ids = with_state_and_notify(&state, &proxy, |s| s.registry.add(raws));
    if ids.is_empty() {
        return Vec::new();
    }
    tracing::info!("Added {} file(s) to the selection", ids.len());
    start_preview_generation(ids, proxy, state)
}

/// Removes one file and releases its preview and result.
pub fn remove_file<P: EventProxy>(id: &FileId, proxy: P, state: Arc<Mutex<AppState>>) {
    let removed = with_state_and_notify(&state, &proxy, |s| s.registry.remove(id));
    if !removed {
        tracing::debug!("removeFile for unknown id {}", id);
    }
}

/// Runs one analysis pass over every selected file.
pub async fn analyze<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<AppState>>,
    services: Services,
) -> Result<DispatchReport, CoreError> {
    run_analysis(proxy, state, services).await
}

/// Clears the selection and the result annotation.
pub fn reset<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let changed = with_state_and_notify(&state, &proxy, |s| {
        s.reset_upload_state().then(|| s.view.location())
    });
    if let Some(location) = changed {
        proxy.send_event(UserEvent::NavigationChanged(location));
    }
}

/// Replaces the configuration with one read from a user-picked file.
///
/// This is a hard reset: the selection and result annotation are cleared and
/// the view is rebuilt from the imported page path, flag key, and preview
/// directory. Refused while an analysis pass is running.
pub fn import_config<P: EventProxy, D: DialogService + ?Sized>(
    dialog: &D,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(path) = dialog.pick_config_to_import() else {
        tracing::info!("User cancelled config import");
        return;
    };

    let new_config = match config::settings::import_config(&path) {
        Ok(new_config) => new_config,
        Err(e) => {
            tracing::warn!("Config import from {:?} failed: {:#}", path, e);
            proxy.send_event(UserEvent::ShowError(format!("Failed to import config: {e}")));
            return;
        }
    };

    let outcome = {
        let mut state_guard = lock_state(&state);
        if state_guard.is_uploading {
            None
        } else {
            let previous_location = state_guard.view.location();
            let config_path = state_guard.config_path.take();
            *state_guard = AppState::new(new_config);
            state_guard.config_path = config_path;
            state_guard.persist_config();

            let location = state_guard.view.location();
            let changed = (location != previous_location).then_some(location);
            Some((generate_ui_state(&state_guard), changed))
        }
    };

    match outcome {
        Some((ui_state, changed)) => {
            proxy.send_event(UserEvent::StateUpdate(Box::new(ui_state)));
            if let Some(location) = changed {
                proxy.send_event(UserEvent::NavigationChanged(location));
            }
        }
        None => proxy.send_event(UserEvent::ShowNotice {
            level: NoticeLevel::Info,
            message: "Wait for the running analysis to finish before importing a configuration."
                .to_string(),
        }),
    }
}

/// Exports the current configuration to a user-picked JSON file.
pub fn export_config<P: EventProxy, D: DialogService + ?Sized>(
    dialog: &D,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(path) = dialog.export_config_path() else {
        tracing::info!("User cancelled config export");
        return;
    };
    let result = config::settings::export_config(&lock_state(&state).config, &path);
    if let Err(e) = &result {
        tracing::warn!("Config export to {:?} failed: {:#}", path, e);
    }
    proxy.send_event(UserEvent::ConfigExported(result.is_ok()));
}
