//! Defines an abstraction over the event sending mechanism.

use super::events::UserEvent;
use tokio::sync::mpsc::UnboundedSender;

/// A trait that abstracts the sending of user events.
/// This is "fire-and-forget" and doesn't return a result, simplifying its use.
pub trait EventProxy: Send + Sync + Clone + 'static {
    fn send_event(&self, event: UserEvent);
}

/// Front ends that consume events from a channel (the CLI, a web bridge).
impl EventProxy for UnboundedSender<UserEvent> {
    fn send_event(&self, event: UserEvent) {
        // A closed receiver means nobody is rendering anymore; log and move on.
        if let Err(e) = self.send(event) {
            tracing::warn!("Failed to deliver event, receiver is gone: {:?}", e.0);
        }
    }
}
