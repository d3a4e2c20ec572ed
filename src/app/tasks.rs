//! Background work started by commands: preview generation and analysis passes.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::events::{NoticeLevel, UserEvent};
use super::helpers::{lock_state, notify_state};
use super::proxy::EventProxy;
use super::state::AppState;
use super::view_model::generate_ui_state;
use super::Services;

use crate::core::{AnalysisDispatcher, CoreError, DispatchReport, FileId};

/// Notice shown when analysis is triggered without any selection.
pub const NO_FILES_NOTICE: &str = "Please select at least one image first!";

/// Starts one preview task per id.
///
/// Each task reads its own file; a failure only marks that item's preview as
/// unavailable. The returned handles can be awaited by callers that need the
/// previews to be ready.
pub fn start_preview_generation<P: EventProxy>(
    ids: Vec<FileId>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Vec<JoinHandle<()>> {
    let (generator, jobs) = {
        let state_guard = lock_state(&state);
        let jobs: Vec<_> = ids
            .into_iter()
            .filter_map(|id| {
                let raw = state_guard.registry.get(&id)?.raw().clone();
                Some((id, raw))
            })
            .collect();
        (state_guard.previews.clone(), jobs)
    };

    jobs.into_iter()
        .map(|(id, raw)| {
            let generator = generator.clone();
            let proxy = proxy.clone();
            let state = state.clone();
            tokio::spawn(async move {
                let preview = generator.make_preview(&raw).await;
                let attached = lock_state(&state).registry.attach_preview(&id, preview);
                match attached {
                    Ok(()) => notify_state(&state, &proxy),
                    Err(e) => tracing::debug!("Preview for {} dropped: {}", raw.name(), e),
                }
            })
        })
        .collect()
}

/// Runs one analysis pass over every file currently selected.
///
/// All requests are dispatched at once and this resolves only after every
/// one of them settled. The busy flag is set for exactly that span, and the
/// shareable result flag is recomputed once at the end.
pub async fn run_analysis<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<AppState>>,
    services: Services,
) -> Result<DispatchReport, CoreError> {
    let jobs = {
        let mut state_guard = lock_state(&state);
        if state_guard.registry.is_empty() {
            Err(CoreError::NoFilesSelected)
        } else if state_guard.is_uploading {
            Err(CoreError::AnalysisInProgress)
        } else {
            state_guard.is_uploading = true;
            let jobs = state_guard.registry.analysis_jobs();
            proxy.send_event(UserEvent::StateUpdate(Box::new(generate_ui_state(
                &state_guard,
            ))));
            Ok(jobs)
        }
    };

    let jobs = match jobs {
        Ok(jobs) => jobs,
        Err(CoreError::NoFilesSelected) => {
            tracing::warn!("Analysis requested with no files selected");
            proxy.send_event(UserEvent::ShowNotice {
                level: NoticeLevel::Warning,
                message: NO_FILES_NOTICE.to_string(),
            });
            return Err(CoreError::NoFilesSelected);
        }
        Err(e) => {
            tracing::info!("Ignoring analysis request: {}", e);
            return Err(e);
        }
    };

    let token = services.session.auth_token();
    if token.is_none() {
        tracing::warn!("No bearer token in the session; requests are sent without one");
    }

    let dispatcher = AnalysisDispatcher::new(services.inference.clone());
    let report = dispatcher
        .dispatch(jobs, token.as_deref(), |id, transition| {
            let result = lock_state(&state).registry.transition(id, transition);
            if result.is_ok() {
                notify_state(&state, &proxy);
            }
            result
        })
        .await;

    let (ui_state, location_changed) = {
        let mut state_guard = lock_state(&state);
        let has_completed = state_guard.registry.has_completed();
        let changed = state_guard.view.reflect(has_completed);
        state_guard.is_uploading = false;
        let location = changed.then(|| state_guard.view.location());
        (generate_ui_state(&state_guard), location)
    };

    proxy.send_event(UserEvent::StateUpdate(Box::new(ui_state)));
    if let Some(location) = location_changed {
        proxy.send_event(UserEvent::NavigationChanged(location));
    }

    Ok(report)
}
