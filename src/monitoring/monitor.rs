use crate::{EventName, ListenerId, MetaEvent, MetaKind};

/// Trait for observing listener registration and removal.
///
/// All methods have default no-op implementations, so you only need to
/// override the ones you care about. Monitors run as meta-listeners, so they
/// follow the registry's dispatch strategy and never fail.
///
/// # Example
///
/// ```rust
/// use heralds::{EventName, ListenerId};
/// use heralds::monitoring::Monitor;
///
/// struct Printer;
///
/// impl Monitor for Printer {
///     fn on_first_listener(&self, event: &EventName, listener: ListenerId) {
///         println!("[first] {listener} on {event}");
///     }
///
///     fn on_no_listeners(&self, event: &EventName) {
///         println!("[none] {event}");
///     }
/// }
/// ```
///
/// # Lifecycle
///
/// For one event:
/// 1. **First listener** - the event goes from zero listeners to one
/// 2. **Add listener** - any listener is added (follows 1)
/// 3. **Remove listener** - any listener is removed
/// 4. **No listeners** - the last listener was removed (follows 3)
pub trait Monitor: Send + Sync {
    /// Called before the first listener of `event` becomes visible.
    fn on_first_listener(&self, event: &EventName, listener: ListenerId) {
        let _e = event;
        let _l = listener;
    }

    /// Called before any listener of `event` becomes visible.
    fn on_add_listener(&self, event: &EventName, listener: ListenerId) {
        let _e = event;
        let _l = listener;
    }

    /// Called after a listener of `event` was removed.
    fn on_remove_listener(&self, event: &EventName, listener: ListenerId) {
        let _e = event;
        let _l = listener;
    }

    /// Called after the last listener of `event` was removed.
    fn on_no_listeners(&self, event: &EventName) {
        let _e = event;
    }

    /// Route a meta-event to the matching callback.
    fn observe(&self, meta: &MetaEvent) {
        let event = meta.event();
        match (meta.kind(), meta.listener()) {
            (MetaKind::FirstListener, Some(id)) => self.on_first_listener(event, id),
            (MetaKind::AddListener, Some(id)) => self.on_add_listener(event, id),
            (MetaKind::RemoveListener, Some(id)) => self.on_remove_listener(event, id),
            (MetaKind::NoListeners, _) => self.on_no_listeners(event),
            _ => {}
        }
    }
}
