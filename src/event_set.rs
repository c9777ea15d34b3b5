use std::collections::BTreeSet;

use crate::{ActivationAware, Error, EventName, Result};

/// The closed set of event names a host type supports.
///
/// Built once per type, at definition time, through the additive and
/// idempotent `declare_*` builder methods. Subtypes start from their parent's
/// set with [`inherit`](Self::inherit), so every ancestor event stays valid.
/// There is no removal operation.
///
/// ```
/// use heralds::EventSet;
///
/// let base = EventSet::new().declare_events(["open", "close"]);
/// let socket = EventSet::new().inherit(&base).declare_event("data");
///
/// assert!(socket.contains("open"));
/// assert!(socket.contains("data"));
/// assert!(!base.contains("data"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    names: BTreeSet<EventName>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a single event name. Declaring a name twice is a no-op.
    pub fn declare_event(mut self, name: impl Into<EventName>) -> Self {
        self.names.insert(name.into());
        self
    }

    /// Declare several event names at once.
    pub fn declare_events<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<EventName>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Copy every declaration of `parent` into this set.
    pub fn inherit(mut self, parent: &EventSet) -> Self {
        self.names.extend(parent.names.iter().cloned());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns the declared (shared) name, or [`Error::UnknownEvent`].
    pub fn resolve(&self, name: &str) -> Result<EventName> {
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownEvent(EventName::new(name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A host type that owns an [`EventRegistry`](crate::EventRegistry).
///
/// Implement it with the [`declare_events!`](crate::declare_events) macro, or
/// by hand when the host also wants activation callbacks:
///
/// ```
/// use std::sync::OnceLock;
/// use heralds::{ActivationAware, EventName, EventSet, EventSource};
///
/// struct Sensor;
///
/// impl EventSource for Sensor {
///     fn event_set() -> &'static EventSet {
///         static SET: OnceLock<EventSet> = OnceLock::new();
///         SET.get_or_init(|| EventSet::new().declare_event("reading"))
///     }
///
///     fn activation(&self) -> Option<&dyn ActivationAware> {
///         Some(self)
///     }
/// }
///
/// impl ActivationAware for Sensor {
///     fn activate_event(&self, _name: &EventName) { /* start polling */ }
///     fn deactivate_event(&self, _name: &EventName) { /* stop polling */ }
/// }
/// ```
pub trait EventSource: Send + Sync + 'static {
    /// The events this type (and its ancestors) declared.
    fn event_set() -> &'static EventSet;

    /// Optional activation capability of this host.
    ///
    /// Returning `Some` makes the registry call
    /// [`ActivationAware::activate_event`] when an event gains its first
    /// listener and [`ActivationAware::deactivate_event`] when it loses its
    /// last one.
    fn activation(&self) -> Option<&dyn ActivationAware> {
        None
    }

    /// Returns `true` if `name` was declared for this type.
    fn event_exists(name: &str) -> bool
    where
        Self: Sized,
    {
        Self::event_set().contains(name)
    }
}

/// Implement [`EventSource`] for a type from a list of event names.
///
/// The second form inherits every event declared by a parent type.
///
/// ```
/// use heralds::{EventSource, declare_events};
///
/// struct Connection;
/// declare_events!(Connection => "open", "close");
///
/// struct TlsConnection;
/// declare_events!(TlsConnection: Connection => "handshake");
///
/// assert!(TlsConnection::event_exists("open"));
/// assert!(TlsConnection::event_exists("handshake"));
/// assert!(!Connection::event_exists("handshake"));
/// ```
#[macro_export]
macro_rules! declare_events {
    ($ty:ty : $parent:ty => $($name:expr),* $(,)?) => {
        impl $crate::EventSource for $ty {
            fn event_set() -> &'static $crate::EventSet {
                static SET: ::std::sync::OnceLock<$crate::EventSet> = ::std::sync::OnceLock::new();
                SET.get_or_init(|| {
                    $crate::EventSet::new()
                        .inherit(<$parent as $crate::EventSource>::event_set())
                        $(.declare_event($name))*
                })
            }
        }
    };
    ($ty:ty => $($name:expr),* $(,)?) => {
        impl $crate::EventSource for $ty {
            fn event_set() -> &'static $crate::EventSet {
                static SET: ::std::sync::OnceLock<$crate::EventSet> = ::std::sync::OnceLock::new();
                SET.get_or_init(|| $crate::EventSet::new()$(.declare_event($name))*)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;
    crate::declare_events!(Base => "open", "close");

    struct Derived;
    crate::declare_events!(Derived: Base => "data", "open");

    struct Leaf;
    crate::declare_events!(Leaf: Derived => "eof");

    #[test]
    fn declarations_are_idempotent() {
        let set = EventSet::new()
            .declare_event("ping")
            .declare_event("ping")
            .declare_events(["ping", "pong"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn declared_names_exist_for_type_and_subtypes() {
        for name in ["open", "close"] {
            assert!(Base::event_exists(name));
            assert!(Derived::event_exists(name));
            assert!(Leaf::event_exists(name));
        }
        assert!(Derived::event_exists("data"));
        assert!(Leaf::event_exists("data"));
        assert!(Leaf::event_exists("eof"));
    }

    #[test]
    fn undeclared_names_do_not_exist() {
        assert!(!Base::event_exists("data"));
        assert!(!Derived::event_exists("eof"));
        assert!(!Leaf::event_exists("Open"));
        assert!(!Leaf::event_exists(""));
    }

    #[test]
    fn resolve_returns_shared_name_or_unknown_event() {
        let set = Derived::event_set();
        let a = set.resolve("data").unwrap();
        let b = set.resolve("data").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            set.resolve("nope"),
            Err(Error::UnknownEvent(EventName::new("nope")))
        );
    }
}
