use crate::{DispatchMode, Result};

use super::{Batch, Dispatcher};

/// Runs listeners one at a time, in registration order, on the caller's stack.
///
/// There is no isolation between listeners: the first `Err` stops the batch
/// and is returned from `emit`, and a panic unwinds into the caller. The
/// registry's current event is set for the duration of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn dispatch(&self, batch: Batch) -> Result<()> {
        let _current = batch.enter();
        for unit in batch.into_units() {
            unit()?;
        }
        Ok(())
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Immediate
    }
}
