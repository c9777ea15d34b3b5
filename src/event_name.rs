use std::{borrow::Borrow, hash::Hash, sync::Arc};

/// Name of an event kind a host type declares.
///
/// Event names are case-sensitive and carry no namespacing. `EventName` is
/// cheap to clone (a shared `Arc<str>`), so it is passed by value into every
/// scheduled unit of work and every meta-event.
///
/// Equality uses string comparison with a fast-path for pointer equality
/// when two names share the same allocation.
///
/// # Example
///
/// ```
/// use heralds::EventName;
///
/// let ping = EventName::new("ping");
/// assert_eq!(ping, EventName::from("ping"));
/// assert_ne!(ping, EventName::from("Ping"));
/// ```
#[derive(Debug, Clone, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventName(Arc<str>);

impl EventName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the string representation of this event name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for EventName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for EventName {}

impl PartialEq<str> for EventName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for EventName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Hash for EventName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

// Hash must agree with `str` so maps keyed by `EventName` can be probed with `&str`.
impl Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&EventName> for EventName {
    fn from(name: &EventName) -> Self {
        name.clone()
    }
}
