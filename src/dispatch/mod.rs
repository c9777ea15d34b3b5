//! Emission strategies.
//!
//! A [`Dispatcher`] receives one [`Batch`] per emission: the event name and
//! one unit of work per listener, in registration order. Two strategies are
//! provided:
//!
//! - [`ImmediateDispatcher`] runs every unit on the caller's stack before
//!   `emit` returns. The first failing listener aborts the rest and its
//!   error reaches the caller.
//! - [`ConcurrentDispatcher`] spawns one Tokio task per unit and returns at
//!   once. Failures stay inside their task and are logged.
//!
//! The strategy is chosen once, usually through
//! [`Config::dispatcher`](crate::Config::dispatcher), and the resulting
//! `Arc<dyn Dispatcher>` is handed to every registry.

mod batch;
mod concurrent;
mod current;
mod immediate;

use std::fmt;

pub use batch::{Batch, Unit};
pub use concurrent::ConcurrentDispatcher;
pub use current::{CurrentEvent, CurrentEventGuard};
pub(crate) use current::task_current_event;
pub use immediate::ImmediateDispatcher;

use crate::{DispatchMode, Result};

/// Strategy that runs (or schedules) the units of an emission.
///
/// Implementations must start units in the order the batch yields them.
pub trait Dispatcher: Send + Sync + fmt::Debug {
    /// Run or schedule every unit of `batch`.
    ///
    /// # Errors
    ///
    /// Synchronous strategies return the first listener fault.
    fn dispatch(&self, batch: Batch) -> Result<()>;

    /// The strategy this dispatcher implements.
    fn mode(&self) -> DispatchMode;
}
