//! Outbound notification seam.

use waitlist_types::events::WaitlistEvent;

/// Receives every notification the waitlist produces.
///
/// Called after the state change it describes has committed. Implementations
/// must not block; the daemon forwards into a broadcast channel.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: WaitlistEvent);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, event: WaitlistEvent) {
        tracing::trace!(kind = ?event.event_type(), "notification dropped");
    }
}
