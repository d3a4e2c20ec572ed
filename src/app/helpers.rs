//! Contains helper functions to reduce boilerplate code in other `app` modules.

use std::sync::{Arc, Mutex, MutexGuard};

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::AppState;
use super::view_model::generate_ui_state;

/// Locks the shared state. A poisoned lock still holds consistent registry
/// data (every mutation is a single registry call), so it is recovered.
pub fn lock_state(state: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("AppState mutex was poisoned; recovering");
        poisoned.into_inner()
    })
}

/// Locks the `AppState`, performs a mutation, and then sends a `StateUpdate`
/// event to the UI. Returns whatever the mutation returned.
pub fn with_state_and_notify<F, R, P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    update_fn: F,
) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    let (result, ui_state) = {
        let mut state_guard = lock_state(state);
        let result = update_fn(&mut state_guard);
        (result, generate_ui_state(&state_guard))
    };

    proxy.send_event(UserEvent::StateUpdate(Box::new(ui_state)));
    result
}

/// Sends the current state to the UI without mutating it.
pub fn notify_state<P: EventProxy>(state: &Mutex<AppState>, proxy: &P) {
    let ui_state = generate_ui_state(&lock_state(state));
    proxy.send_event(UserEvent::StateUpdate(Box::new(ui_state)));
}
