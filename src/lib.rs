#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Heralds
//!
//! A per-object event registry for Rust and Tokio.
//!
//! A host type declares the events it supports, owns an [`EventRegistry`],
//! and lets callers register listeners against those names. Emitting an
//! event runs every listener in registration order, either immediately on the
//! caller's stack or as one Tokio task per listener. Every change to a
//! listener set is announced through four meta-events, so a host can start
//! work when someone starts listening and stop when the last listener leaves.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use heralds::*;
//!
//! struct Thermometer {
//!     events: EventRegistry<Thermometer, f64>,
//! }
//! declare_events!(Thermometer => "reading", "alarm");
//!
//! fn main() -> Result {
//!     let dispatcher = Config::default()
//!         .with_dispatch_mode(DispatchMode::Immediate)
//!         .dispatcher();
//!     let thermo = Arc::new_cyclic(|me| Thermometer {
//!         events: EventRegistry::new(me.clone(), dispatcher),
//!     });
//!
//!     let printer = thermo.events.on(["reading", "alarm"], Listener::new(|_: &Thermometer, celsius: &f64| {
//!         println!("{celsius:.1} C");
//!         Ok(())
//!     }))?;
//!     thermo.events.once(["alarm"], Listener::new(|_: &Thermometer, _: &f64| {
//!         println!("first alarm!");
//!         Ok(())
//!     }))?;
//!
//!     thermo.events.emit("reading", 21.5)?;
//!     thermo.events.emit("alarm", 80.0)?;
//!
//!     thermo.events.remove_listener("reading", &printer)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EventSet`] | Closed set of event names a type declares |
//! | [`EventSource`] | Trait for host types (use [`declare_events!`]) |
//! | [`EventRegistry`] | Per-instance registry: `on`, `once`, `emit`, `remove_listener` |
//! | [`EventMeta`] | Listener set and meta-event channels of one event |
//! | [`Listener`] | Callable plus a stable [`ListenerId`] |
//! | [`MetaEvent`] | Payload of the `first_listener`, `add_listener`, `remove_listener` and `no_listeners` meta-events |
//! | [`Dispatcher`](dispatch::Dispatcher) | Emission strategy, immediate or concurrent |
//! | [`Config`] | Resolves the dispatcher once per process |
//!
//! ## Dispatch
//!
//! | Strategy | Listener runs | Listener fault |
//! |----------|---------------|----------------|
//! | [`Immediate`](DispatchMode::Immediate) | on the caller's stack, before `emit` returns | returned from `emit`, later listeners skipped |
//! | [`Concurrent`](DispatchMode::Concurrent) | in its own Tokio task | logged, confined to that task |
//!
//! Both start listeners in registration order.
//!
//! ## Features
//!
//! - **`monitoring`** (default) - [`Monitor`](monitoring::Monitor) trait and ready-made [`monitors`]
//! - **`test-harness`** - recording helpers in [`testing`] (enables `monitoring`)
//! - **`serde`** - serialization for [`Config`], [`EventName`], [`ListenerId`] and [`MetaEvent`]
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - `ping.rs` - listeners, once-listeners and meta-events on one host
//! - `lifecycle.rs` - activation hooks under concurrent dispatch

mod activation;
mod config;
mod error;
mod event_meta;
mod event_name;
mod event_set;
mod listener;
mod meta;
mod registry;

pub mod dispatch;

#[cfg(any(test, feature = "test-harness"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-harness")))]
pub mod testing;

#[cfg(feature = "monitoring")]
#[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
pub mod monitoring;

#[cfg(feature = "monitoring")]
#[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
pub mod monitors;

pub use activation::ActivationAware;
pub use config::{Config, DispatchMode};
pub use dispatch::CurrentEvent;
pub use error::Error;
pub use event_meta::EventMeta;
pub use event_name::EventName;
pub use event_set::{EventSet, EventSource};
pub use listener::{Listener, ListenerId};
pub use meta::{MetaEvent, MetaKind};
pub use registry::EventRegistry;

/// Convenience alias for `Result<T, heralds::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
