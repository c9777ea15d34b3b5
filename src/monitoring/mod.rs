//! Monitoring API for observing listener lifecycle.
//!
//! Enabled by the `monitoring` feature (on by default):
//!
//! ```toml
//! [dependencies]
//! heralds = { version = "0.1", features = ["monitoring"] }
//! ```
//!
//! # Overview
//!
//! A [`Monitor`] is a bundle of meta-listeners. Attach it to a single event
//! with [`EventMeta::monitor`](crate::EventMeta::monitor) or to every event
//! of a host with [`EventRegistry::monitor`](crate::EventRegistry::monitor),
//! which also covers events that get their first listener later.
//!
//! # Example
//!
//! ```ignore
//! use heralds::monitoring::Monitor;
//!
//! struct Leaks;
//!
//! impl Monitor for Leaks {
//!     fn on_add_listener(&self, event: &EventName, listener: ListenerId) {
//!         println!("[add] {listener} on {event}");
//!     }
//! }
//!
//! host.events().monitor(Leaks);
//! ```

mod monitor;

pub use monitor::Monitor;
