use std::sync::Arc;

use parking_lot::Mutex;

use crate::EventName;

/// Event a spawned unit runs for, together with the slot of the registry
/// that scheduled it.
#[derive(Clone)]
pub(crate) struct TaskEvent {
    owner: Arc<CurrentEvent>,
    event: EventName,
}

tokio::task_local! {
    static TASK_EVENT: TaskEvent;
}

/// Event name the running task was scheduled for by the registry owning
/// `current`, if any.
pub(crate) fn task_current_event(current: &Arc<CurrentEvent>) -> Option<EventName> {
    TASK_EVENT
        .try_with(|task| Arc::ptr_eq(&task.owner, current).then(|| task.event.clone()))
        .ok()
        .flatten()
}

/// Run `future` with `event` as the task-local current event of the
/// registry owning `current`.
pub(crate) fn scope_task<F: Future>(
    current: Arc<CurrentEvent>,
    event: EventName,
    future: F,
) -> tokio::task::futures::TaskLocalFuture<TaskEvent, F> {
    TASK_EVENT.scope(
        TaskEvent {
            owner: current,
            event,
        },
        future,
    )
}

/// Registry slot naming the event dispatched synchronously right now.
///
/// Nested emissions stack: each [`enter`](Self::enter) remembers the previous
/// value and its guard puts it back on drop, including when a listener fails
/// or panics.
#[derive(Debug, Default)]
pub struct CurrentEvent {
    slot: Mutex<Option<EventName>>,
}

impl CurrentEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<EventName> {
        self.slot.lock().clone()
    }

    pub fn enter(self: &Arc<Self>, event: EventName) -> CurrentEventGuard {
        let previous = self.slot.lock().replace(event);
        CurrentEventGuard {
            current: Arc::clone(self),
            previous,
        }
    }
}

/// Restores the previous current event when dropped.
#[derive(Debug)]
#[must_use = "the current event is restored as soon as the guard drops"]
pub struct CurrentEventGuard {
    current: Arc<CurrentEvent>,
    previous: Option<EventName>,
}

impl Drop for CurrentEventGuard {
    fn drop(&mut self) {
        *self.current.slot.lock() = self.previous.take();
    }
}
