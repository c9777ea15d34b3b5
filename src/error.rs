use std::sync::Arc;

use crate::{EventName, ListenerId};

/// The single error type for all heralds operations.
///
/// Every fallible API returns `heralds::Result<T>` (alias for
/// `Result<T, heralds::Error>`). Listener bodies return the same type, so a
/// fault raised inside a listener travels through dispatch unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Unknown event '{0}'")]
    UnknownEvent(EventName),

    #[error("Listener {0} has no resolvable identity")]
    InvalidListener(ListenerId),

    #[error("At least one event name is required")]
    NoEventNames,

    #[error("Listener for '{event}' failed: {message}")]
    Listener { event: EventName, message: String },

    #[error("External error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap any error raised inside a listener body.
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    /// A plain-text listener fault for `event`.
    pub fn listener(event: impl Into<EventName>, message: impl Into<String>) -> Self {
        Error::Listener {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for [`Error::UnknownEvent`].
    pub fn is_unknown_event(&self) -> bool {
        matches!(self, Error::UnknownEvent(_))
    }

    /// Returns `true` for [`Error::InvalidListener`].
    pub fn is_invalid_listener(&self) -> bool {
        matches!(self, Error::InvalidListener(_))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UnknownEvent(a), Self::UnknownEvent(b)) => a == b,
            (Self::InvalidListener(a), Self::InvalidListener(b)) => a == b,
            (Self::NoEventNames, Self::NoEventNames) => true,
            (
                Self::Listener {
                    event: e1,
                    message: m1,
                },
                Self::Listener {
                    event: e2,
                    message: m2,
                },
            ) => e1 == e2 && m1 == m2,
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::External(Arc::new(e))
    }
}
