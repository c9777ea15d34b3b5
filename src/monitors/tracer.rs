use crate::{EventName, ListenerId, monitoring::Monitor};

/// A monitor that logs listener lifecycle to the `tracing` crate.
///
/// Log levels:
/// - `trace` - listener added/removed (high volume)
/// - `debug` - event activated (first listener) or deactivated (no listeners)
///
/// # Example
///
/// ```ignore
/// use heralds::monitors::Tracer;
///
/// registry.monitor(Tracer);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracer;

impl Monitor for Tracer {
    fn on_first_listener(&self, event: &EventName, listener: ListenerId) {
        tracing::debug!(
            event = %event,
            listener = %listener,
            "event activated"
        );
    }

    fn on_add_listener(&self, event: &EventName, listener: ListenerId) {
        tracing::trace!(
            event = %event,
            listener = %listener,
            "listener added"
        );
    }

    fn on_remove_listener(&self, event: &EventName, listener: ListenerId) {
        tracing::trace!(
            event = %event,
            listener = %listener,
            "listener removed"
        );
    }

    fn on_no_listeners(&self, event: &EventName) {
        tracing::debug!(event = %event, "event deactivated");
    }
}
