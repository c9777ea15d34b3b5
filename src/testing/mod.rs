//! Recording helpers for asserting on listener and meta-event flow.
//!
//! Enable with the `test-harness` feature:
//!
//! ```toml
//! [dev-dependencies]
//! heralds = { version = "0.1", features = ["test-harness"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use heralds::testing::{CallLog, MetaRecorder};
//!
//! let log = CallLog::new();
//! host.events.on(["ping"], log.listener("a"))?;
//!
//! let recorder = MetaRecorder::new();
//! recorder.attach(&host.events.meta("ping")?);
//!
//! host.events.emit("ping", ())?;
//! assert_eq!(log.entries(), ["a"]);
//! ```
//!
//! # Warning
//!
//! **Do not use in production.** Both recorders grow without bound.

mod call_log;
mod meta_recorder;

pub use call_log::CallLog;
pub use meta_recorder::MetaRecorder;
