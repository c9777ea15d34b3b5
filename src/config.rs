use std::{fmt, sync::Arc};

use tokio::runtime::Handle;

use crate::dispatch::{ConcurrentDispatcher, Dispatcher, ImmediateDispatcher};

/// Which emission strategy registries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DispatchMode {
    /// Concurrent when a Tokio runtime is available at resolution time,
    /// immediate otherwise.
    #[default]
    Auto,

    /// Run listeners synchronously on the caller's stack.
    Immediate,

    /// Spawn one Tokio task per listener.
    Concurrent,
}

impl DispatchMode {
    /// Resolve [`Auto`](Self::Auto) against the calling thread.
    pub fn resolve(self) -> DispatchMode {
        match self {
            DispatchMode::Auto if Handle::try_current().is_ok() => DispatchMode::Concurrent,
            DispatchMode::Auto => DispatchMode::Immediate,
            other => other,
        }
    }

    /// Returns `true` if this is the [`Immediate`](Self::Immediate) mode.
    pub fn is_immediate(&self) -> bool {
        matches!(self, DispatchMode::Immediate)
    }

    /// Returns `true` if this is the [`Concurrent`](Self::Concurrent) mode.
    pub fn is_concurrent(&self) -> bool {
        matches!(self, DispatchMode::Concurrent)
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Auto => write!(f, "Auto"),
            DispatchMode::Immediate => write!(f, "Immediate"),
            DispatchMode::Concurrent => write!(f, "Concurrent"),
        }
    }
}

/// Process-level configuration for event registries.
///
/// Resolve it once at startup with [`dispatcher`](Self::dispatcher) and pass
/// the result to every [`EventRegistry`](crate::EventRegistry).
///
/// # Examples
///
/// ```rust
/// use heralds::{Config, DispatchMode};
///
/// let config = Config::default()
///     .with_dispatch_mode(DispatchMode::Immediate)
///     .with_listener_warn_threshold(Some(16));
///
/// let dispatcher = config.dispatcher();
/// assert_eq!(dispatcher.mode(), DispatchMode::Immediate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Emission strategy.
    /// Default: `Auto`
    dispatch_mode: DispatchMode,

    /// Log a warning the first time an event holds more listeners than this.
    /// `None` disables the check.
    /// Default: 64
    listener_warn_threshold: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dispatch_mode: DispatchMode::Auto,
            listener_warn_threshold: Some(64),
        }
    }
}

impl Config {
    /// Set the emission strategy.
    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    /// Returns the configured (unresolved) emission strategy.
    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch_mode
    }

    /// Set the listener count above which a warning is logged.
    pub fn with_listener_warn_threshold(mut self, threshold: Option<usize>) -> Self {
        self.listener_warn_threshold = threshold;
        self
    }

    /// Returns the listener warning threshold.
    pub fn listener_warn_threshold(&self) -> Option<usize> {
        self.listener_warn_threshold
    }

    /// Build the dispatcher this configuration asks for.
    ///
    /// [`DispatchMode::Auto`] is resolved against the calling thread. Asking
    /// for [`DispatchMode::Concurrent`] outside a Tokio runtime falls back to
    /// the immediate strategy with a warning.
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        match (self.dispatch_mode.resolve(), Handle::try_current()) {
            (DispatchMode::Concurrent, Ok(handle)) => Arc::new(ConcurrentDispatcher::on(handle)),
            (DispatchMode::Concurrent, Err(_)) => {
                tracing::warn!("no Tokio runtime available, falling back to immediate dispatch");
                Arc::new(ImmediateDispatcher)
            }
            _ => Arc::new(ImmediateDispatcher),
        }
    }

    /// Build the dispatcher this configuration asks for, spawning onto `handle`.
    ///
    /// [`DispatchMode::Auto`] resolves to concurrent dispatch.
    pub fn dispatcher_on(&self, handle: Handle) -> Arc<dyn Dispatcher> {
        match self.dispatch_mode {
            DispatchMode::Immediate => Arc::new(ImmediateDispatcher),
            DispatchMode::Auto | DispatchMode::Concurrent => {
                Arc::new(ConcurrentDispatcher::on(handle))
            }
        }
    }
}
