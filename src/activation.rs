use crate::EventName;

/// Optional host capability for activation transitions.
///
/// A lighter alternative to registering `first_listener` / `no_listeners`
/// meta-listeners: hosts expose it through
/// [`EventSource::activation`](crate::EventSource::activation) and the
/// registry calls it when an event gains its first listener or loses its
/// last one. Hooks are skipped once the host itself is being dropped.
pub trait ActivationAware {
    /// Called after `name` went from zero listeners to one.
    fn activate_event(&self, name: &EventName);

    /// Called after the last listener of `name` was removed.
    fn deactivate_event(&self, name: &EventName);
}
