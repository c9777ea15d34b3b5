use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{EventMeta, EventSource, ListenerId, MetaEvent, MetaKind};

/// Records every meta-event it observes, in arrival order.
///
/// Attach it to one event with [`attach`](Self::attach), or (with the
/// `monitoring` feature) to a whole registry as a
/// [`Monitor`](crate::monitoring::Monitor).
#[derive(Clone, Default)]
pub struct MetaRecorder {
    events: Arc<Mutex<Vec<MetaEvent>>>,
}

impl MetaRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recording meta-listener on all four channels of `meta`.
    ///
    /// Returns the ids in [`MetaKind::ALL`] order.
    pub fn attach<O, A>(&self, meta: &EventMeta<O, A>) -> [ListenerId; 4]
    where
        O: EventSource,
        A: Send + Sync + 'static,
    {
        MetaKind::ALL.map(|kind| {
            let recorder = self.clone();
            meta.on_meta(kind, move |event| {
                recorder.record(event);
                Ok(())
            })
        })
    }

    pub fn record(&self, event: &MetaEvent) {
        self.events.lock().push(event.clone());
    }

    pub fn events(&self) -> Vec<MetaEvent> {
        self.events.lock().clone()
    }

    /// Recorded kinds, oldest first.
    pub fn kinds(&self) -> Vec<MetaKind> {
        self.events.lock().iter().map(MetaEvent::kind).collect()
    }

    /// Recorded events rendered with their `Display` form,
    /// e.g. `"add_listener(ping, #3)"`.
    pub fn lines(&self) -> Vec<String> {
        self.events.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(feature = "monitoring")]
impl crate::monitoring::Monitor for MetaRecorder {
    fn observe(&self, event: &MetaEvent) {
        self.record(event);
    }
}

impl fmt::Debug for MetaRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaRecorder")
            .field("len", &self.len())
            .finish()
    }
}
