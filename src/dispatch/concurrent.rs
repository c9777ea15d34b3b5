use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use crate::{DispatchMode, Result};

use super::{Batch, Dispatcher, current::scope_task};

/// Schedules every listener as its own Tokio task and returns immediately.
///
/// Tasks are spawned in registration order on the runtime captured at
/// construction, so `emit` may be called from threads outside the runtime.
/// Each task carries its event name and the emitting registry as a
/// task-local value, which keeps
/// [`EventRegistry::current_event`](crate::EventRegistry::current_event)
/// correct for interleaved emissions. Meta-event tasks carry none. A failing listener is logged and never
/// affects the emitter or the other listeners; a panicking one only takes
/// down its own task.
#[derive(Debug, Clone)]
pub struct ConcurrentDispatcher {
    handle: Handle,
    tracker: TaskTracker,
}

impl ConcurrentDispatcher {
    /// Create a dispatcher bound to the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, like [`Handle::current`].
    pub fn new() -> Self {
        Self::on(Handle::current())
    }

    /// Create a dispatcher that spawns onto `handle`.
    pub fn on(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Number of scheduled units that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every unit scheduled so far has finished.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Default for ConcurrentDispatcher {
    /// Same as [`ConcurrentDispatcher::new`]; panics outside a Tokio runtime.
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for ConcurrentDispatcher {
    fn dispatch(&self, batch: Batch) -> Result<()> {
        let event = batch.event().clone();
        let current = batch.current().cloned();
        for unit in batch.into_units() {
            let name = event.clone();
            let task = async move {
                if let Err(e) = unit() {
                    tracing::warn!(event = %name, error = %e, "listener failed");
                }
            };
            match &current {
                Some(current) => {
                    let scoped = scope_task(Arc::clone(current), event.clone(), task);
                    self.tracker.spawn_on(scoped, &self.handle);
                }
                None => {
                    self.tracker.spawn_on(task, &self.handle);
                }
            }
        }
        Ok(())
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Concurrent
    }
}
