use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{EventName, ListenerId, monitoring::Monitor};

/// Lifecycle counters of one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub first: usize,
    pub added: usize,
    pub removed: usize,
    pub none: usize,
}

/// Monitor that counts listener lifecycle transitions per event.
///
/// Attach one clone and query another at any time from any thread.
///
/// ```ignore
/// let monitor = ListenerMonitor::new();
/// let query = monitor.clone();
/// host.events().monitor(monitor);
///
/// // Later:
/// let stats = query.stats("ping");
/// let live = query.live_listeners("ping");
/// ```
#[derive(Clone)]
pub struct ListenerMonitor {
    inner: Arc<Mutex<ListenerMonitorInner>>,
}

#[derive(Default)]
struct ListenerMonitorInner {
    stats: BTreeMap<EventName, ListenerStats>,
    live: BTreeMap<EventName, HashSet<ListenerId>>,
}

impl ListenerMonitor {
    /// Create a new `ListenerMonitor`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerMonitorInner::default())),
        }
    }

    /// Counters observed for `event`.
    pub fn stats(&self, event: &str) -> ListenerStats {
        let lock = self.inner.lock();
        lock.stats.get(event).copied().unwrap_or_default()
    }

    /// Number of listeners of `event` added and not yet removed.
    pub fn live_listeners(&self, event: &str) -> usize {
        let lock = self.inner.lock();
        lock.live.get(event).map_or(0, HashSet::len)
    }

    /// Events that currently have live listeners.
    pub fn active_events(&self) -> Vec<EventName> {
        let lock = self.inner.lock();
        lock.live
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(event, _)| event.clone())
            .collect()
    }
}

impl Monitor for ListenerMonitor {
    fn on_first_listener(&self, event: &EventName, _listener: ListenerId) {
        let mut lock = self.inner.lock();
        lock.stats.entry(event.clone()).or_default().first += 1;
    }

    fn on_add_listener(&self, event: &EventName, listener: ListenerId) {
        let mut lock = self.inner.lock();
        lock.stats.entry(event.clone()).or_default().added += 1;
        lock.live.entry(event.clone()).or_default().insert(listener);
    }

    fn on_remove_listener(&self, event: &EventName, listener: ListenerId) {
        let mut lock = self.inner.lock();
        lock.stats.entry(event.clone()).or_default().removed += 1;
        if let Some(ids) = lock.live.get_mut(event) {
            ids.remove(&listener);
        }
    }

    fn on_no_listeners(&self, event: &EventName) {
        let mut lock = self.inner.lock();
        lock.stats.entry(event.clone()).or_default().none += 1;
    }
}

impl Default for ListenerMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lock = self.inner.lock();
        f.debug_struct("ListenerMonitor")
            .field("events", &lock.stats.len())
            .field("live", &lock.live.values().map(HashSet::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_transitions_per_event() {
        let monitor = ListenerMonitor::new();
        let ping = EventName::new("ping");
        let a = ListenerId::from(1);
        let b = ListenerId::from(2);

        monitor.on_first_listener(&ping, a);
        monitor.on_add_listener(&ping, a);
        monitor.on_add_listener(&ping, b);
        monitor.on_remove_listener(&ping, a);

        assert_eq!(
            monitor.stats("ping"),
            ListenerStats {
                first: 1,
                added: 2,
                removed: 1,
                none: 0
            }
        );
        assert_eq!(monitor.live_listeners("ping"), 1);
        assert_eq!(monitor.active_events(), vec![ping.clone()]);

        monitor.on_remove_listener(&ping, b);
        monitor.on_no_listeners(&ping);
        assert_eq!(monitor.stats("ping").none, 1);
        assert!(monitor.active_events().is_empty());
    }

    #[test]
    fn unknown_event_has_empty_stats() {
        let monitor = ListenerMonitor::default();
        assert_eq!(monitor.stats("nope"), ListenerStats::default());
        assert_eq!(monitor.live_listeners("nope"), 0);
    }
}
