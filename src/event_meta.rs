use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{
    Error, EventName, EventSource, Listener, ListenerId, MetaEvent, MetaKind, Result,
    dispatch::{Batch, Unit},
    listener::Invocation,
    meta::{MetaChannels, MetaEntry},
    registry::Shared,
};

#[cfg(feature = "monitoring")]
use crate::monitoring::Monitor;

/// Listener set of one event on one host instance, plus its meta-event channels.
///
/// Created lazily by the owning [`EventRegistry`](crate::EventRegistry) and
/// shared as `Arc<EventMeta>`. The operations mirror the registry's but need
/// no event name:
///
/// | Registry | EventMeta |
/// |----------|-----------|
/// | `on` | [`listen`](Self::listen) |
/// | `once` | [`listen_once`](Self::listen_once) |
/// | `remove_listener` | [`stop_listener`](Self::stop_listener) |
/// | `remove_all_listeners` | [`stop_all_listeners`](Self::stop_all_listeners) |
/// | `emit` | [`emit_self`](Self::emit_self) |
///
/// Every mutation fires meta-events on the four [`MetaKind`] channels:
/// `first_listener` then `add_listener` when the first listener arrives
/// (both before it becomes visible), and `remove_listener` then
/// `no_listeners` when the last one leaves.
///
/// No lock is held while listeners, meta-listeners or host hooks run, so all
/// of them may call back into the registry.
pub struct EventMeta<O, A> {
    name: EventName,
    shared: Arc<Shared<O>>,
    listeners: Mutex<Vec<Listener<O, A>>>,
    channels: Mutex<MetaChannels>,
    warned: AtomicBool,
}

impl<O: EventSource, A: Send + Sync + 'static> EventMeta<O, A> {
    pub(crate) fn new(name: EventName, shared: Arc<Shared<O>>) -> Self {
        Self {
            name,
            shared,
            listeners: Mutex::new(Vec::new()),
            channels: Mutex::new(MetaChannels::default()),
            warned: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &EventName {
        &self.name
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// An event is active while it has at least one listener.
    pub fn is_active(&self) -> bool {
        !self.is_empty()
    }

    /// Snapshot of the listeners in dispatch order.
    pub fn listeners(&self) -> Vec<Listener<O, A>> {
        self.listeners.lock().clone()
    }

    /// Returns `true` if `id` resolves to a registered listener.
    pub fn contains(&self, id: impl Into<ListenerId>) -> bool {
        let id = id.into();
        resolve(&self.listeners.lock(), id).is_some()
    }

    /// Register `listener`. Registering an identity that is already present
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised by a meta-listener under immediate
    /// dispatch; the listener is not registered in that case.
    pub fn listen(&self, listener: Listener<O, A>) -> Result<Listener<O, A>> {
        let id = listener.id();
        let was_empty = {
            let listeners = self.listeners.lock();
            if listeners.iter().any(|l| l.id() == id) {
                return Ok(listener);
            }
            listeners.is_empty()
        };

        if was_empty {
            self.fire(MetaKind::FirstListener, Some(id))?;
        }
        self.fire(MetaKind::AddListener, Some(id))?;

        let (activated, count) = {
            let mut listeners = self.listeners.lock();
            // a meta-listener may have registered the same handle meanwhile
            if listeners.iter().any(|l| l.id() == id) {
                return Ok(listener);
            }
            let activated = listeners.is_empty();
            listeners.push(listener.clone());
            (activated, listeners.len())
        };
        trace!(event = %self.name, listener = %id, count, "listener added");

        self.check_threshold(count);
        if activated {
            self.notify_host(true);
        }
        Ok(listener)
    }

    /// Register `listener` so that it runs at most once for this event.
    ///
    /// Returns the wrapping handle; the original handle still removes it.
    pub fn listen_once(&self, listener: Listener<O, A>) -> Result<Listener<O, A>> {
        self.listen(Listener::once(listener))
    }

    /// Remove the listener `id` resolves to.
    ///
    /// `id` may be the stored handle's own id or the id of any layer it
    /// wraps. Returns `Ok(false)` when nothing matched.
    ///
    /// The removal always completes: `remove_listener` fires, and when the
    /// set is emptied `no_listeners` fires and the host is deactivated, even
    /// if a meta-listener fails along the way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidListener`] for an id that was never minted,
    /// or the first meta-listener fault under immediate dispatch.
    pub fn stop_listener(&self, id: impl Into<ListenerId>) -> Result<bool> {
        let id = id.into();
        if !id.is_resolvable() {
            return Err(Error::InvalidListener(id));
        }

        let (removed, emptied) = {
            let mut listeners = self.listeners.lock();
            let Some(position) = resolve(&listeners, id) else {
                return Ok(false);
            };
            let removed = listeners.remove(position);
            (removed, listeners.is_empty())
        };
        trace!(event = %self.name, listener = %removed.id(), "listener removed");

        let mut fault = self.fire(MetaKind::RemoveListener, Some(removed.id())).err();
        if emptied {
            keep_first(&mut fault, self.deactivate());
        }
        fault.map_or(Ok(true), Err)
    }

    /// Remove every listener, firing `remove_listener` for each and
    /// `no_listeners` once at the end. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// The first meta-listener fault under immediate dispatch, returned
    /// after every meta-event has fired.
    pub fn stop_all_listeners(&self) -> Result<usize> {
        let removed = std::mem::take(&mut *self.listeners.lock());
        if removed.is_empty() {
            return Ok(0);
        }
        trace!(event = %self.name, count = removed.len(), "all listeners removed");

        let mut fault = None;
        for listener in &removed {
            keep_first(&mut fault, self.fire(MetaKind::RemoveListener, Some(listener.id())));
        }
        keep_first(&mut fault, self.deactivate());
        fault.map_or(Ok(removed.len()), Err)
    }

    /// Dispatch `args` to every listener of this event.
    ///
    /// The listener list is snapshotted first: listeners added during the
    /// emission wait for the next one, listeners removed during it still run.
    /// Does nothing when there are no listeners or the owner is gone.
    ///
    /// # Errors
    ///
    /// Under immediate dispatch, the first listener fault; remaining
    /// listeners are skipped.
    pub fn emit_self(self: &Arc<Self>, args: A) -> Result<()> {
        let snapshot = self.listeners();
        if snapshot.is_empty() {
            return Ok(());
        }
        let Some(owner) = self.shared.owner.upgrade() else {
            trace!(event = %self.name, "owner dropped, emission skipped");
            return Ok(());
        };
        trace!(event = %self.name, listeners = snapshot.len(), "emitting");

        let args = Arc::new(args);
        let units = snapshot
            .into_iter()
            .map(|listener| {
                let owner = Arc::clone(&owner);
                let args = Arc::clone(&args);
                let meta = Arc::clone(self);
                Box::new(move || {
                    listener.invoke(&Invocation {
                        owner: &owner,
                        meta: &meta,
                        args: &args,
                    })
                }) as Unit
            })
            .collect();

        self.shared.dispatcher.dispatch(Batch::new(
            self.name.clone(),
            Arc::clone(&self.shared.current),
            units,
        ))
    }

    /// Register a meta-listener on one channel.
    pub fn on_meta<F>(&self, kind: MetaKind, f: F) -> ListenerId
    where
        F: Fn(&MetaEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.push_meta(kind, false, Arc::new(f))
    }

    /// Register a meta-listener that runs for the next `kind` event only.
    pub fn once_meta<F>(&self, kind: MetaKind, f: F) -> ListenerId
    where
        F: Fn(&MetaEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.push_meta(kind, true, Arc::new(f))
    }

    /// Remove a meta-listener. Returns `false` if it was not registered.
    pub fn remove_meta(&self, kind: MetaKind, id: ListenerId) -> bool {
        self.channels.lock().remove(kind, id)
    }

    /// Number of meta-listeners on one channel.
    pub fn meta_listener_count(&self, kind: MetaKind) -> usize {
        self.channels.lock().len(kind)
    }

    /// Attach `monitor` to all four meta channels.
    ///
    /// The returned id removes it again with
    /// [`remove_monitor`](Self::remove_monitor).
    #[cfg(feature = "monitoring")]
    #[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
    pub fn monitor(&self, monitor: impl Monitor + 'static) -> ListenerId {
        let id = ListenerId::next();
        self.attach_monitor(id, Arc::new(monitor));
        id
    }

    /// Detach a monitor from every channel.
    #[cfg(feature = "monitoring")]
    #[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
    pub fn remove_monitor(&self, id: ListenerId) -> bool {
        let mut channels = self.channels.lock();
        MetaKind::ALL
            .iter()
            .fold(false, |found, kind| channels.remove(*kind, id) || found)
    }

    #[cfg(feature = "monitoring")]
    pub(crate) fn attach_monitor(&self, id: ListenerId, monitor: Arc<dyn Monitor>) {
        let mut channels = self.channels.lock();
        for kind in MetaKind::ALL {
            let monitor = Arc::clone(&monitor);
            channels.push(
                kind,
                MetaEntry {
                    id,
                    once: false,
                    call: Arc::new(move |event: &MetaEvent| {
                        monitor.observe(event);
                        Ok(())
                    }),
                },
            );
        }
    }

    fn push_meta(&self, kind: MetaKind, once: bool, call: Arc<crate::meta::MetaFn>) -> ListenerId {
        let id = ListenerId::next();
        self.channels.lock().push(kind, MetaEntry { id, once, call });
        id
    }

    /// Dispatch one meta-event. Meta channels never fire meta-events.
    fn fire(&self, kind: MetaKind, listener: Option<ListenerId>) -> Result<()> {
        let entries = self.channels.lock().take_for_dispatch(kind);
        if entries.is_empty() {
            return Ok(());
        }

        let event = Arc::new(MetaEvent::new(kind, self.name.clone(), listener));
        let units = entries
            .into_iter()
            .map(|entry| {
                let event = Arc::clone(&event);
                Box::new(move || (entry.call)(&event)) as Unit
            })
            .collect();

        self.shared
            .dispatcher
            .dispatch(Batch::detached(EventName::new(kind.as_str()), units))
    }

    /// Finish an emptying transition; the host hook runs even if
    /// `no_listeners` fails.
    fn deactivate(&self) -> Result<()> {
        let fired = self.fire(MetaKind::NoListeners, None);
        self.notify_host(false);
        fired
    }

    fn notify_host(&self, active: bool) {
        let Some(owner) = self.shared.owner.upgrade() else {
            return;
        };
        if let Some(hook) = owner.activation() {
            if active {
                hook.activate_event(&self.name);
            } else {
                hook.deactivate_event(&self.name);
            }
        }
    }

    fn check_threshold(&self, count: usize) {
        if let Some(limit) = self.shared.warn_threshold {
            if count > limit && !self.warned.swap(true, Ordering::Relaxed) {
                warn!(
                    event = %self.name,
                    count,
                    limit,
                    "listener count exceeds threshold, possible leak"
                );
            }
        }
    }
}

fn keep_first(fault: &mut Option<Error>, result: Result<()>) {
    if let Err(e) = result {
        fault.get_or_insert(e);
    }
}

/// Position of the entry `id` names: an exact id match wins over an alias.
fn resolve<O, A>(listeners: &[Listener<O, A>], id: ListenerId) -> Option<usize> {
    listeners
        .iter()
        .position(|l| l.id() == id)
        .or_else(|| listeners.iter().position(|l| l.answers_to(id)))
}

impl<O, A> fmt::Debug for EventMeta<O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMeta")
            .field("name", &self.name)
            .field("listeners.len()", &self.listeners.lock().len())
            .finish()
    }
}
