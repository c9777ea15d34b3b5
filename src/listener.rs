use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{EventMeta, EventSource, Result};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a registered listener.
///
/// Ids are minted from a process-wide counter, so they are unique across
/// every registry. An id that was never minted (for example one rebuilt from
/// a stale log line) has no resolvable identity and is rejected with
/// [`Error::InvalidListener`](crate::Error::InvalidListener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns `true` if this id was handed out by this process.
    pub fn is_resolvable(&self) -> bool {
        self.0 != 0 && self.0 < NEXT_LISTENER_ID.load(Ordering::Relaxed)
    }
}

impl From<u64> for ListenerId {
    fn from(value: u64) -> Self {
        ListenerId(value)
    }
}

impl From<ListenerId> for u64 {
    fn from(value: ListenerId) -> Self {
        value.0
    }
}

impl<O, A> From<&Listener<O, A>> for ListenerId {
    fn from(listener: &Listener<O, A>) -> Self {
        listener.id
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a stored listener sees when its event fires.
pub(crate) struct Invocation<'a, O, A> {
    pub(crate) owner: &'a O,
    pub(crate) meta: &'a EventMeta<O, A>,
    pub(crate) args: &'a A,
}

type CallFn<O, A> = dyn Fn(&Invocation<'_, O, A>) -> Result<()> + Send + Sync;

/// Handle of a listener: a callable plus a stable identity.
///
/// The callable receives the owning host and the event arguments. Clones
/// share both the callable and the id, so the same handle can be registered
/// under several events and later removed from all of them.
///
/// Wrapping a listener (as [`EventRegistry::once`](crate::EventRegistry::once)
/// does) yields a new handle with its own id that remembers the ids of every
/// layer it wraps. Removal by any of those ids resolves to the same entry.
///
/// ```
/// use heralds::Listener;
///
/// struct Host;
/// let greet: Listener<Host, String> = Listener::new(|_host: &Host, name: &String| {
///     println!("hello {name}");
///     Ok(())
/// });
/// let same = greet.clone();
/// assert_eq!(greet, same);
/// ```
pub struct Listener<O, A = ()> {
    id: ListenerId,
    aliases: Arc<[ListenerId]>,
    call: Arc<CallFn<O, A>>,
}

impl<O: 'static, A: 'static> Listener<O, A> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&O, &A) -> Result<()> + Send + Sync + 'static,
    {
        Self::from_call(Arc::from(Vec::new()), move |inv: &Invocation<'_, O, A>| {
            f(inv.owner, inv.args)
        })
    }

    fn from_call<F>(aliases: Arc<[ListenerId]>, call: F) -> Self
    where
        F: Fn(&Invocation<'_, O, A>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            id: ListenerId::next(),
            aliases,
            call: Arc::new(call),
        }
    }
}

impl<O: EventSource, A: Send + Sync + 'static> Listener<O, A> {
    /// Wrap `inner` in a shim that removes itself from the triggering event
    /// before forwarding the call.
    ///
    /// The shim only forwards when that removal actually happened, so a shim
    /// scheduled twice before running fires once per event.
    pub(crate) fn once(inner: Listener<O, A>) -> Self {
        let aliases: Arc<[ListenerId]> = std::iter::once(inner.id)
            .chain(inner.aliases.iter().copied())
            .collect();
        let own_id = ListenerId::next();
        let call = move |inv: &Invocation<'_, O, A>| {
            if inv.meta.stop_listener(own_id)? {
                inner.invoke(inv)
            } else {
                Ok(())
            }
        };
        Self {
            id: own_id,
            aliases,
            call: Arc::new(call),
        }
    }
}

impl<O, A> Listener<O, A> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Ids of the layers this handle wraps, innermost last.
    pub fn aliases(&self) -> &[ListenerId] {
        &self.aliases
    }

    /// Returns `true` if `id` is this handle's own id or one of its aliases.
    pub fn answers_to(&self, id: ListenerId) -> bool {
        self.id == id || self.aliases.contains(&id)
    }

    pub(crate) fn invoke(&self, inv: &Invocation<'_, O, A>) -> Result<()> {
        (self.call)(inv)
    }
}

impl<O, A> Clone for Listener<O, A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            aliases: Arc::clone(&self.aliases),
            call: Arc::clone(&self.call),
        }
    }
}

impl<O, A> PartialEq for Listener<O, A> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<O, A> Eq for Listener<O, A> {}

impl<O, A> Hash for Listener<O, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<O, A> fmt::Debug for Listener<O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("aliases", &self.aliases)
            .finish()
    }
}
