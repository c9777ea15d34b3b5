use std::{fmt, sync::Arc};

use crate::{EventName, Result};

use super::{CurrentEvent, CurrentEventGuard};

/// One listener invocation, ready to run.
pub type Unit = Box<dyn FnOnce() -> Result<()> + Send>;

/// The ordered units of work produced by one emission.
///
/// A batch emitted for a declared event carries the registry's
/// [`CurrentEvent`] slot. Meta-event batches are detached: they run without
/// touching any registry's current event.
pub struct Batch {
    event: EventName,
    current: Option<Arc<CurrentEvent>>,
    units: Vec<Unit>,
}

impl Batch {
    pub(crate) fn new(event: EventName, current: Arc<CurrentEvent>, units: Vec<Unit>) -> Self {
        Self {
            event,
            current: Some(current),
            units,
        }
    }

    pub(crate) fn detached(event: EventName, units: Vec<Unit>) -> Self {
        Self {
            event,
            current: None,
            units,
        }
    }

    /// The event being dispatched.
    pub fn event(&self) -> &EventName {
        &self.event
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Slot of the registry this batch was emitted on; `None` for
    /// meta-event batches.
    pub fn current(&self) -> Option<&Arc<CurrentEvent>> {
        self.current.as_ref()
    }

    /// Mark this batch's event as the registry's current event until the
    /// guard drops. Detached batches leave every slot alone.
    pub fn enter(&self) -> Option<CurrentEventGuard> {
        self.current
            .as_ref()
            .map(|current| current.enter(self.event.clone()))
    }

    /// Consume the batch, yielding its units in registration order.
    pub fn into_units(self) -> Vec<Unit> {
        self.units
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("event", &self.event)
            .field("detached", &self.current.is_none())
            .field("units", &self.units.len())
            .finish()
    }
}
