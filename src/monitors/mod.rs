//! Ready-to-use monitor implementations.
//!
//! # Available Monitors
//!
//! - [`Tracer`] - Logs listener lifecycle via the `tracing` crate
//! - [`ListenerMonitor`] - Counts lifecycle transitions per event
//!
//! # Example
//!
//! ```ignore
//! use heralds::monitors::Tracer;
//!
//! host.events().monitor(Tracer);
//! ```

mod tracer;
pub use tracer::Tracer;

mod listener_monitor;
pub use listener_monitor::{ListenerMonitor, ListenerStats};
