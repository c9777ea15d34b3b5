use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    Config, CurrentEvent, Error, EventMeta, EventName, EventSource, Listener, ListenerId, Result,
    dispatch::{Dispatcher, task_current_event},
};

#[cfg(feature = "monitoring")]
use crate::monitoring::Monitor;

/// State every [`EventMeta`] of one registry shares.
pub(crate) struct Shared<O> {
    pub(crate) owner: Weak<O>,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) current: Arc<CurrentEvent>,
    pub(crate) warn_threshold: Option<usize>,
}

/// Per-instance event registry.
///
/// A host type declares its events (see [`declare_events!`](crate::declare_events)),
/// owns one `EventRegistry` and builds itself with [`Arc::new_cyclic`] so the
/// registry can hand the host to its listeners:
///
/// ```rust
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use heralds::{Config, DispatchMode, EventRegistry, Listener, declare_events};
///
/// struct Door {
///     events: EventRegistry<Door, &'static str>,
/// }
/// declare_events!(Door => "opened", "closed");
///
/// let dispatcher = Config::default()
///     .with_dispatch_mode(DispatchMode::Immediate)
///     .dispatcher();
/// let door = Arc::new_cyclic(|me| Door {
///     events: EventRegistry::new(me.clone(), dispatcher),
/// });
///
/// let opened = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&opened);
/// door.events.on(["opened"], Listener::new(move |_door: &Door, who: &&'static str| {
///     println!("opened by {who}");
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// }))?;
///
/// door.events.emit("opened", "alice")?;
/// assert_eq!(opened.load(Ordering::SeqCst), 1);
/// assert!(door.events.emit("slammed", "bob").unwrap_err().is_unknown_event());
/// # Ok::<(), heralds::Error>(())
/// ```
///
/// # Lifecycle
///
/// The registry lives exactly as long as its host. Call
/// [`teardown`](Self::teardown) before dropping the host to let
/// removal-triggered meta-listeners run under concurrent dispatch; otherwise
/// `Drop` removes the remaining listeners synchronously.
pub struct EventRegistry<O: EventSource, A: Send + Sync + 'static = ()> {
    shared: Arc<Shared<O>>,
    metas: Mutex<BTreeMap<EventName, Arc<EventMeta<O, A>>>>,
    #[cfg(feature = "monitoring")]
    monitors: Mutex<Vec<(ListenerId, Arc<dyn Monitor>)>>,
}

impl<O: EventSource, A: Send + Sync + 'static> EventRegistry<O, A> {
    /// Create a registry for the host `owner` with default settings.
    pub fn new(owner: Weak<O>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_config(owner, dispatcher, &Config::default())
    }

    /// Create a registry for the host `owner`.
    ///
    /// `dispatcher` is usually built once per process with
    /// [`Config::dispatcher`] and shared by every registry.
    pub fn with_config(owner: Weak<O>, dispatcher: Arc<dyn Dispatcher>, config: &Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                owner,
                dispatcher,
                current: Arc::new(CurrentEvent::new()),
                warn_threshold: config.listener_warn_threshold(),
            }),
            metas: Mutex::new(BTreeMap::new()),
            #[cfg(feature = "monitoring")]
            monitors: Mutex::new(Vec::new()),
        }
    }

    /// The dispatcher every emission of this registry goes through.
    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.shared.dispatcher
    }

    /// Returns `true` if `name` was declared for the host type or an ancestor.
    pub fn event_exists(&self, name: &str) -> bool {
        O::event_set().contains(name)
    }

    /// Name of the event being dispatched right now, if any.
    ///
    /// Inside a concurrently scheduled listener this is the event that
    /// scheduled it; otherwise it is the innermost synchronous emission of
    /// this registry.
    pub fn current_event(&self) -> Option<EventName> {
        task_current_event(&self.shared.current).or_else(|| self.shared.current.get())
    }

    /// Snapshot of the listeners of `name`, in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if `name` was not declared.
    pub fn event_listeners(&self, name: &str) -> Result<Vec<Listener<O, A>>> {
        let name = self.resolve(name)?;
        Ok(self
            .existing(&name)
            .map(|meta| meta.listeners())
            .unwrap_or_default())
    }

    /// Number of listeners of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if `name` was not declared.
    pub fn listener_count(&self, name: &str) -> Result<usize> {
        let name = self.resolve(name)?;
        Ok(self.existing(&name).map_or(0, |meta| meta.len()))
    }

    /// Events that currently have at least one listener.
    pub fn active_events(&self) -> Vec<EventName> {
        self.metas
            .lock()
            .values()
            .filter(|meta| meta.is_active())
            .map(|meta| meta.name().clone())
            .collect()
    }

    /// The [`EventMeta`] of `name`, created if needed.
    ///
    /// Use it to register meta-listeners before any listener exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if `name` was not declared.
    pub fn meta(&self, name: &str) -> Result<Arc<EventMeta<O, A>>> {
        let name = self.resolve(name)?;
        Ok(self.meta_for(name))
    }

    /// Register `listener` under every name in `names`.
    ///
    /// All names are validated before any registration happens. The returned
    /// handle is the same for every name, so one
    /// [`remove_listener`](Self::remove_listener) per name (or
    /// [`remove_all_listeners`](Self::remove_all_listeners)) undoes it.
    ///
    /// # Errors
    ///
    /// - [`Error::NoEventNames`] if `names` is empty
    /// - [`Error::UnknownEvent`] if any name was not declared
    /// - the first meta-listener fault under immediate dispatch
    pub fn on(
        &self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
        listener: Listener<O, A>,
    ) -> Result<Listener<O, A>> {
        for name in self.resolve_all(names)? {
            self.meta_for(name).listen(listener.clone())?;
        }
        Ok(listener)
    }

    /// Register `listener` to run once per name in `names`.
    ///
    /// The listener is wrapped in a shim with its own id. When one of the
    /// events fires, the shim removes itself from that event only and then
    /// forwards the call; its registrations under the other names stay until
    /// they fire or are removed. The returned wrapper (or the original
    /// `listener`) removes the remaining registrations.
    ///
    /// # Errors
    ///
    /// Same as [`on`](Self::on).
    pub fn once(
        &self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
        listener: Listener<O, A>,
    ) -> Result<Listener<O, A>> {
        let names = self.resolve_all(names)?;
        let wrapper = Listener::once(listener);
        for name in names {
            self.meta_for(name).listen(wrapper.clone())?;
        }
        Ok(wrapper)
    }

    /// Invoke every listener of `name` with `args`.
    ///
    /// Emitting an event that never had a listener is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownEvent`] if `name` was not declared
    /// - the first listener fault under immediate dispatch
    pub fn emit(&self, name: &str, args: A) -> Result<()> {
        let name = self.resolve(name)?;
        let Some(meta) = self.existing(&name) else {
            trace!(event = %name, "no listeners, emission skipped");
            return Ok(());
        };
        meta.emit_self(args)
    }

    /// Remove the listener `id` resolves to from `name`.
    ///
    /// `id` may be a [`&Listener`](Listener) or a raw [`ListenerId`], and may
    /// name the stored handle or any layer it wraps. Returns `Ok(false)` when
    /// nothing was registered under that identity.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownEvent`] if `name` was not declared
    /// - [`Error::InvalidListener`] if `id` was never minted
    /// - the first meta-listener fault under immediate dispatch
    pub fn remove_listener(&self, name: &str, id: impl Into<ListenerId>) -> Result<bool> {
        let name = self.resolve(name)?;
        let id = id.into();
        if !id.is_resolvable() {
            return Err(Error::InvalidListener(id));
        }
        match self.existing(&name) {
            Some(meta) => meta.stop_listener(id),
            None => Ok(false),
        }
    }

    /// Remove every listener of `name`, or of every event when `name` is `None`.
    ///
    /// Fires `remove_listener` per listener and `no_listeners` once per event.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownEvent`] if `name` was not declared
    /// - the first meta-listener fault under immediate dispatch
    pub fn remove_all_listeners(&self, name: Option<&str>) -> Result<()> {
        let metas = match name {
            Some(name) => {
                let name = self.resolve(name)?;
                self.existing(&name).into_iter().collect()
            }
            None => self.snapshot(),
        };
        for meta in metas {
            meta.stop_all_listeners()?;
        }
        Ok(())
    }

    /// Attach `monitor` to every event of this registry, including events
    /// whose [`EventMeta`] is created later.
    #[cfg(feature = "monitoring")]
    #[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
    pub fn monitor(&self, monitor: impl Monitor + 'static) -> ListenerId {
        let id = ListenerId::next();
        let monitor: Arc<dyn Monitor> = Arc::new(monitor);
        let metas = self.metas.lock();
        self.monitors.lock().push((id, Arc::clone(&monitor)));
        for meta in metas.values() {
            meta.attach_monitor(id, Arc::clone(&monitor));
        }
        id
    }

    /// Detach a monitor attached with [`monitor`](Self::monitor).
    #[cfg(feature = "monitoring")]
    #[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
    pub fn remove_monitor(&self, id: ListenerId) -> bool {
        let metas = self.metas.lock();
        let mut monitors = self.monitors.lock();
        let before = monitors.len();
        monitors.retain(|(m, _)| *m != id);
        for meta in metas.values() {
            meta.remove_monitor(id);
        }
        monitors.len() != before
    }

    /// Remove every listener, firing meta-events, then give scheduled
    /// meta-listeners a chance to run.
    ///
    /// Under concurrent dispatch this yields once, so units scheduled by the
    /// removal start before the host becomes unreachable.
    pub async fn teardown(&self) {
        self.release_all();
        if self.shared.dispatcher.mode().is_concurrent() {
            tokio::task::yield_now().await;
        }
    }

    fn release_all(&self) {
        let mut released = 0;
        for meta in self.snapshot() {
            match meta.stop_all_listeners() {
                Ok(count) => released += count,
                Err(e) => warn!(event = %meta.name(), error = %e, "meta-listener failed during teardown"),
            }
        }
        if released > 0 {
            debug!(listeners = released, "event registry released");
        }
    }

    fn resolve(&self, name: &str) -> Result<EventName> {
        O::event_set().resolve(name)
    }

    fn resolve_all(&self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Vec<EventName>> {
        let names = names
            .into_iter()
            .map(|name| self.resolve(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if names.is_empty() {
            return Err(Error::NoEventNames);
        }
        Ok(names)
    }

    fn existing(&self, name: &EventName) -> Option<Arc<EventMeta<O, A>>> {
        self.metas.lock().get(name).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<EventMeta<O, A>>> {
        self.metas.lock().values().cloned().collect()
    }

    fn meta_for(&self, name: EventName) -> Arc<EventMeta<O, A>> {
        let mut metas = self.metas.lock();
        if let Some(meta) = metas.get(&name) {
            return Arc::clone(meta);
        }
        trace!(event = %name, "event meta created");
        let meta = Arc::new(EventMeta::new(name.clone(), Arc::clone(&self.shared)));
        #[cfg(feature = "monitoring")]
        for (id, monitor) in self.monitors.lock().iter() {
            meta.attach_monitor(*id, Arc::clone(monitor));
        }
        metas.insert(name, Arc::clone(&meta));
        meta
    }
}

impl<O: EventSource, A: Send + Sync + 'static> Drop for EventRegistry<O, A> {
    fn drop(&mut self) {
        // meta-listeners must not run while unwinding, a second panic aborts
        if std::thread::panicking() {
            debug!("event registry dropped during panic, meta-events skipped");
            return;
        }
        self.release_all();
    }
}

impl<O: EventSource, A: Send + Sync + 'static> fmt::Debug for EventRegistry<O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("declared", &O::event_set().len())
            .field("metas", &self.metas.lock().len())
            .field("dispatcher", &self.shared.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::{
        ActivationAware, EventSet, MetaKind,
        dispatch::{ConcurrentDispatcher, ImmediateDispatcher},
        testing::{CallLog, MetaRecorder},
    };

    struct Pinger {
        events: EventRegistry<Pinger, u32>,
        hooks: CallLog,
    }

    impl EventSource for Pinger {
        fn event_set() -> &'static EventSet {
            static SET: OnceLock<EventSet> = OnceLock::new();
            SET.get_or_init(|| EventSet::new().declare_events(["ping", "pong"]))
        }

        fn activation(&self) -> Option<&dyn ActivationAware> {
            Some(self)
        }
    }

    impl ActivationAware for Pinger {
        fn activate_event(&self, name: &EventName) {
            self.hooks.push(format!("activate:{name}"));
        }

        fn deactivate_event(&self, name: &EventName) {
            self.hooks.push(format!("deactivate:{name}"));
        }
    }

    fn pinger(dispatcher: Arc<dyn Dispatcher>) -> Arc<Pinger> {
        Arc::new_cyclic(|me| Pinger {
            events: EventRegistry::new(me.clone(), dispatcher),
            hooks: CallLog::new(),
        })
    }

    fn immediate() -> Arc<Pinger> {
        pinger(Arc::new(ImmediateDispatcher))
    }

    #[test]
    fn meta_events_bracket_listener_lifecycle() {
        let host = immediate();
        let log = CallLog::new();
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());

        let a = host.events.on(["ping"], log.listener("a")).unwrap();
        let b = host.events.on(["ping"], log.listener("b")).unwrap();
        assert_eq!(
            recorder.kinds(),
            [MetaKind::FirstListener, MetaKind::AddListener, MetaKind::AddListener]
        );
        assert_eq!(recorder.events()[0].listener(), Some(a.id()));
        assert_eq!(host.events.active_events(), ["ping"]);

        assert!(host.events.remove_listener("ping", &a).unwrap());
        assert!(host.events.remove_listener("ping", &b).unwrap());
        assert_eq!(
            recorder.kinds()[3..],
            [MetaKind::RemoveListener, MetaKind::RemoveListener, MetaKind::NoListeners]
        );
        assert_eq!(recorder.events()[5].listener(), None);
        assert_eq!(host.hooks.entries(), ["activate:ping", "deactivate:ping"]);
        assert!(host.events.active_events().is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn add_listener_fires_before_listener_is_visible() {
        let host = immediate();
        let seen = CallLog::new();
        let meta = host.events.meta("ping").unwrap();
        for kind in [MetaKind::AddListener, MetaKind::RemoveListener] {
            let weak = Arc::downgrade(&host);
            let seen = seen.clone();
            meta.on_meta(kind, move |event| {
                if let Some(host) = weak.upgrade() {
                    let count = host.events.listener_count("ping")?;
                    seen.push(format!("{}:{count}", event.kind()));
                }
                Ok(())
            });
        }

        let a = host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
        host.events.remove_listener("ping", &a).unwrap();
        assert_eq!(seen.entries(), ["add_listener:0", "remove_listener:0"]);
    }

    #[test]
    fn emit_runs_listeners_in_registration_order() {
        let host = immediate();
        let log = CallLog::new();
        for label in ["a", "b", "c"] {
            host.events.on(["ping"], log.listener(label)).unwrap();
        }
        host.events
            .on(
                ["ping"],
                Listener::new({
                    let log = log.clone();
                    move |_: &Pinger, n: &u32| {
                        log.push(format!("n={n}"));
                        Ok(())
                    }
                }),
            )
            .unwrap();

        host.events.emit("ping", 7).unwrap();
        assert_eq!(log.entries(), ["a", "b", "c", "n=7"]);
        host.events.emit("pong", 1).unwrap();
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn registering_same_handle_twice_is_noop() {
        let host = immediate();
        let log = CallLog::new();
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());

        let a = log.listener("a");
        host.events.on(["ping"], a.clone()).unwrap();
        host.events.on(["ping"], a.clone()).unwrap();

        assert_eq!(host.events.listener_count("ping").unwrap(), 1);
        assert_eq!(recorder.len(), 2);
        host.events.emit("ping", 0).unwrap();
        assert_eq!(log.entries(), ["a"]);
    }

    #[test]
    fn one_handle_under_several_events() {
        let host = immediate();
        let log = CallLog::new();
        let a = host.events.on(["ping", "pong"], log.listener("a")).unwrap();

        host.events.emit("ping", 0).unwrap();
        host.events.emit("pong", 0).unwrap();
        assert_eq!(log.count("a"), 2);

        assert!(host.events.remove_listener("ping", &a).unwrap());
        assert_eq!(host.events.listener_count("pong").unwrap(), 1);
        assert_eq!(host.events.event_listeners("pong").unwrap(), [a]);
    }

    #[test]
    fn once_listener_runs_once_and_deactivates() {
        let host = immediate();
        let log = CallLog::new();
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());

        let inner = log.listener("once");
        let wrapper = host.events.once(["ping"], inner.clone()).unwrap();
        assert_ne!(wrapper.id(), inner.id());

        host.events.emit("ping", 0).unwrap();
        host.events.emit("ping", 0).unwrap();

        assert_eq!(log.entries(), ["once"]);
        assert_eq!(host.events.listener_count("ping").unwrap(), 0);
        assert_eq!(
            recorder.kinds(),
            [
                MetaKind::FirstListener,
                MetaKind::AddListener,
                MetaKind::RemoveListener,
                MetaKind::NoListeners
            ]
        );
        assert_eq!(recorder.events()[2].listener(), Some(wrapper.id()));
        assert_eq!(host.hooks.entries(), ["activate:ping", "deactivate:ping"]);
    }

    #[test]
    fn once_listener_removable_by_original_handle() {
        let host = immediate();
        let log = CallLog::new();
        let inner = log.listener("x");
        host.events.once(["ping"], inner.clone()).unwrap();

        assert!(host.events.remove_listener("ping", &inner).unwrap());
        assert!(!host.events.remove_listener("ping", &inner).unwrap());
        host.events.emit("ping", 0).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn exact_id_wins_over_alias() {
        let host = immediate();
        let log = CallLog::new();
        let inner = log.listener("plain");
        host.events.once(["ping"], inner.clone()).unwrap();
        host.events.on(["ping"], inner.clone()).unwrap();

        // the plain registration is removed, the once wrapper stays
        assert!(host.events.remove_listener("ping", &inner).unwrap());
        let left = host.events.event_listeners("ping").unwrap();
        assert_eq!(left.len(), 1);
        assert_ne!(left[0].id(), inner.id());
        assert!(left[0].answers_to(inner.id()));
    }

    #[test]
    fn once_under_several_names_fires_once_per_name() {
        let host = immediate();
        let log = CallLog::new();
        host.events.once(["ping", "pong"], log.listener("o")).unwrap();

        host.events.emit("ping", 0).unwrap();
        assert_eq!(log.count("o"), 1);
        assert_eq!(host.events.listener_count("ping").unwrap(), 0);
        assert_eq!(host.events.listener_count("pong").unwrap(), 1);

        host.events.emit("ping", 0).unwrap();
        host.events.emit("pong", 0).unwrap();
        host.events.emit("pong", 0).unwrap();
        assert_eq!(log.count("o"), 2);
    }

    #[test]
    fn argument_errors() {
        let host = immediate();
        let l = CallLog::new().listener("l");

        assert_eq!(
            host.events.emit("nope", 0),
            Err(Error::UnknownEvent(EventName::new("nope")))
        );
        assert_eq!(
            host.events.on(Vec::<&str>::new(), l.clone()),
            Err(Error::NoEventNames)
        );
        assert!(host.events.on(["ping", "nope"], l.clone()).unwrap_err().is_unknown_event());
        assert_eq!(host.events.listener_count("ping").unwrap(), 0);

        let bogus = ListenerId::from(u64::MAX);
        assert_eq!(
            host.events.remove_listener("ping", bogus),
            Err(Error::InvalidListener(bogus))
        );
        assert!(
            host.events
                .remove_listener("nope", &l)
                .unwrap_err()
                .is_unknown_event()
        );
        assert!(!host.events.remove_listener("ping", &l).unwrap());
        assert!(host.events.remove_all_listeners(Some("nope")).is_err());
        assert!(host.events.meta("nope").is_err());
    }

    #[test]
    fn immediate_fault_aborts_remaining_listeners() {
        let host = immediate();
        let log = CallLog::new();
        host.events.on(["ping"], log.listener("a")).unwrap();
        host.events
            .on(
                ["ping"],
                Listener::new(|_: &Pinger, _: &u32| Err(Error::listener("ping", "boom"))),
            )
            .unwrap();
        host.events.on(["ping"], log.listener("c")).unwrap();

        assert_eq!(
            host.events.emit("ping", 0),
            Err(Error::listener("ping", "boom"))
        );
        assert_eq!(log.entries(), ["a"]);
        assert_eq!(host.events.current_event(), None);
    }

    #[test]
    fn nested_emission_tracks_current_event() {
        let host = immediate();
        let log = CallLog::new();
        let record = |label: &'static str| {
            let log = log.clone();
            Listener::new(move |host: &Pinger, _: &u32| {
                let current = host.events.current_event();
                log.push(format!("{label}@{}", current.as_ref().map_or("-", EventName::as_str)));
                Ok(())
            })
        };

        host.events.on(["pong"], record("inner")).unwrap();
        host.events.on(["ping"], record("before")).unwrap();
        host.events
            .on(
                ["ping"],
                Listener::new(|host: &Pinger, n: &u32| host.events.emit("pong", *n + 1)),
            )
            .unwrap();
        host.events.on(["ping"], record("after")).unwrap();

        host.events.emit("ping", 0).unwrap();
        assert_eq!(log.entries(), ["before@ping", "inner@pong", "after@ping"]);
        assert_eq!(host.events.current_event(), None);
    }

    #[test]
    fn emission_uses_snapshot_of_listeners() {
        let host = immediate();
        let log = CallLog::new();
        let late = log.listener("late");
        let victim = log.listener("victim");

        host.events
            .on(
                ["ping"],
                Listener::new({
                    let late = late.clone();
                    let victim = victim.clone();
                    move |host: &Pinger, _: &u32| {
                        host.events.remove_listener("ping", &victim)?;
                        host.events.on(["ping"], late.clone())?;
                        Ok(())
                    }
                }),
            )
            .unwrap();
        host.events.on(["ping"], victim).unwrap();

        host.events.emit("ping", 0).unwrap();
        assert_eq!(log.entries(), ["victim"]);

        host.events.emit("ping", 0).unwrap();
        assert_eq!(log.entries(), ["victim", "late"]);
    }

    #[test]
    fn remove_all_listeners_fires_per_listener_then_once() {
        let host = immediate();
        let log = CallLog::new();
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());

        host.events.on(["ping"], log.listener("a")).unwrap();
        host.events.on(["ping"], log.listener("b")).unwrap();
        host.events.on(["pong"], log.listener("c")).unwrap();
        recorder.clear();

        host.events.remove_all_listeners(Some("ping")).unwrap();
        assert_eq!(
            recorder.kinds(),
            [MetaKind::RemoveListener, MetaKind::RemoveListener, MetaKind::NoListeners]
        );
        assert_eq!(host.events.active_events(), ["pong"]);

        host.events.remove_all_listeners(None).unwrap();
        assert!(host.events.active_events().is_empty());
        assert_eq!(
            host.hooks.entries(),
            [
                "activate:ping",
                "activate:pong",
                "deactivate:ping",
                "deactivate:pong"
            ]
        );
    }

    #[test]
    fn once_meta_listener_runs_once() {
        let host = immediate();
        let seen = CallLog::new();
        let meta = host.events.meta("ping").unwrap();
        let s = seen.clone();
        meta.once_meta(MetaKind::AddListener, move |event| {
            s.push(event.to_string());
            Ok(())
        });
        assert_eq!(meta.meta_listener_count(MetaKind::AddListener), 1);

        let a = host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
        host.events.on(["ping"], CallLog::new().listener("b")).unwrap();
        assert_eq!(seen.entries(), [format!("add_listener(ping, {})", a.id())]);
        assert_eq!(meta.meta_listener_count(MetaKind::AddListener), 0);
    }

    #[test]
    fn meta_listener_fault_blocks_registration() {
        let host = immediate();
        let meta = host.events.meta("ping").unwrap();
        let id = meta.on_meta(MetaKind::AddListener, |_| Err(Error::listener("ping", "no")));

        assert!(host.events.on(["ping"], CallLog::new().listener("a")).is_err());
        assert_eq!(host.events.listener_count("ping").unwrap(), 0);

        assert!(meta.remove_meta(MetaKind::AddListener, id));
        assert!(host.events.on(["ping"], CallLog::new().listener("a")).is_ok());
    }

    #[test]
    fn drop_releases_remaining_listeners() {
        let host = immediate();
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());
        host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
        let hooks = host.hooks.clone();

        drop(host);
        assert_eq!(
            recorder.kinds()[2..],
            [MetaKind::RemoveListener, MetaKind::NoListeners]
        );
        // the host is gone, so only the activation hook ran
        assert_eq!(hooks.entries(), ["activate:ping"]);
    }

    #[test]
    fn removal_completes_when_meta_listener_fails() {
        let host = immediate();
        let recorder = MetaRecorder::new();
        let meta = host.events.meta("ping").unwrap();
        recorder.attach(&meta);
        meta.on_meta(MetaKind::RemoveListener, |_| Err(Error::listener("ping", "boom")));

        let a = host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
        assert_eq!(
            host.events.remove_listener("ping", &a),
            Err(Error::listener("ping", "boom"))
        );
        assert_eq!(host.events.listener_count("ping").unwrap(), 0);
        assert_eq!(
            recorder.kinds()[2..],
            [MetaKind::RemoveListener, MetaKind::NoListeners]
        );
        assert_eq!(host.hooks.entries(), ["activate:ping", "deactivate:ping"]);

        host.events.on(["ping"], CallLog::new().listener("b")).unwrap();
        host.events.on(["ping"], CallLog::new().listener("c")).unwrap();
        recorder.clear();
        assert!(host.events.remove_all_listeners(Some("ping")).is_err());
        assert_eq!(
            recorder.kinds(),
            [MetaKind::RemoveListener, MetaKind::RemoveListener, MetaKind::NoListeners]
        );
        assert_eq!(
            host.hooks.entries(),
            [
                "activate:ping",
                "deactivate:ping",
                "activate:ping",
                "deactivate:ping"
            ]
        );
    }

    #[test]
    fn removing_twice_fires_meta_events_once() {
        let host = immediate();
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());
        let a = host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
        recorder.clear();

        assert!(host.events.remove_listener("ping", &a).unwrap());
        assert!(!host.events.remove_listener("ping", &a).unwrap());
        assert_eq!(
            recorder.kinds(),
            [MetaKind::RemoveListener, MetaKind::NoListeners]
        );
    }

    #[test]
    fn meta_listeners_never_see_meta_kind_as_current_event() {
        let host = immediate();
        let seen = CallLog::new();
        let meta = host.events.meta("pong").unwrap();
        let weak = Arc::downgrade(&host);
        let s = seen.clone();
        meta.on_meta(MetaKind::AddListener, move |_| {
            if let Some(host) = weak.upgrade() {
                let current = host.events.current_event();
                s.push(current.map_or_else(|| "-".to_string(), |e| e.to_string()));
            }
            Ok(())
        });

        host.events.on(["pong"], CallLog::new().listener("a")).unwrap();
        host.events
            .on(
                ["ping"],
                Listener::new(|host: &Pinger, _: &u32| {
                    host.events.on(["pong"], CallLog::new().listener("b"))?;
                    Ok(())
                }),
            )
            .unwrap();
        host.events.emit("ping", 0).unwrap();

        assert_eq!(seen.entries(), ["-", "ping"]);
    }

    #[test]
    fn drop_while_panicking_skips_meta_events() {
        let recorder = MetaRecorder::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let host = immediate();
            let meta = host.events.meta("ping").unwrap();
            recorder.attach(&meta);
            meta.on_meta(MetaKind::RemoveListener, |_| panic!("meta-listener panicked"));
            host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
            panic!("host code panicked");
        }));

        assert!(outcome.is_err());
        assert_eq!(
            recorder.kinds(),
            [MetaKind::FirstListener, MetaKind::AddListener]
        );
    }

    #[cfg(feature = "monitoring")]
    #[test]
    fn registry_monitor_covers_later_events() {
        let host = immediate();
        let recorder = MetaRecorder::new();
        let id = host.events.monitor(recorder.clone());

        let a = host.events.on(["ping"], CallLog::new().listener("a")).unwrap();
        assert_eq!(
            recorder.lines(),
            [
                format!("first_listener(ping, {})", a.id()),
                format!("add_listener(ping, {})", a.id())
            ]
        );

        assert!(host.events.remove_monitor(id));
        assert!(!host.events.remove_monitor(id));
        host.events.on(["pong"], CallLog::new().listener("b")).unwrap();
        assert_eq!(recorder.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_emit_defers_listeners() {
        let dispatcher = Arc::new(ConcurrentDispatcher::new());
        let host = pinger(dispatcher.clone());
        let log = CallLog::new();
        host.events.on(["ping"], log.listener("a")).unwrap();
        host.events
            .on(
                ["ping"],
                Listener::new({
                    let log = log.clone();
                    move |host: &Pinger, _: &u32| {
                        let current = host.events.current_event();
                        log.push(current.map_or_else(String::new, |e| e.to_string()));
                        Ok(())
                    }
                }),
            )
            .unwrap();
        host.events
            .on(
                ["ping"],
                Listener::new(|_: &Pinger, _: &u32| Err(Error::listener("ping", "ignored"))),
            )
            .unwrap();

        host.events.emit("ping", 0).unwrap();
        assert!(log.is_empty());

        dispatcher.settle().await;
        assert_eq!(log.entries(), ["a", "ping"]);
    }

    #[tokio::test]
    async fn concurrent_once_forwards_only_once() {
        let dispatcher = Arc::new(ConcurrentDispatcher::new());
        let host = pinger(dispatcher.clone());
        let log = CallLog::new();
        host.events.once(["ping"], log.listener("once")).unwrap();

        // both emissions schedule the shim before it runs
        host.events.emit("ping", 0).unwrap();
        host.events.emit("ping", 0).unwrap();
        dispatcher.settle().await;

        assert_eq!(log.entries(), ["once"]);
        assert_eq!(host.events.listener_count("ping").unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_current_event_is_per_registry() {
        let dispatcher = Arc::new(ConcurrentDispatcher::new());
        let host = pinger(dispatcher.clone());
        let other = immediate();
        let seen = CallLog::new();
        let meta = host.events.meta("ping").unwrap();
        {
            let weak = Arc::downgrade(&host);
            let seen = seen.clone();
            meta.on_meta(MetaKind::AddListener, move |_| {
                if let Some(host) = weak.upgrade() {
                    let current = host.events.current_event();
                    let current = current.map_or_else(|| "-".to_string(), |e| e.to_string());
                    seen.push(format!("meta:{current}"));
                }
                Ok(())
            });
        }
        host.events
            .on(
                ["ping"],
                Listener::new({
                    let seen = seen.clone();
                    move |host: &Pinger, _: &u32| {
                        let mine = host.events.current_event();
                        let theirs = other.events.current_event();
                        seen.push(format!("mine:{mine:?} theirs:{theirs:?}"));
                        Ok(())
                    }
                }),
            )
            .unwrap();

        host.events.emit("ping", 0).unwrap();
        dispatcher.settle().await;

        assert_eq!(
            seen.entries(),
            [
                "meta:-".to_string(),
                format!("mine:{:?} theirs:None", Some(EventName::new("ping"))),
            ]
        );
    }

    #[tokio::test]
    async fn teardown_lets_meta_listeners_run() {
        let dispatcher = Arc::new(ConcurrentDispatcher::new());
        let host = pinger(dispatcher.clone());
        let recorder = MetaRecorder::new();
        recorder.attach(&host.events.meta("ping").unwrap());
        host.events.on(["ping"], CallLog::new().listener("a")).unwrap();

        host.events.teardown().await;
        dispatcher.settle().await;

        assert_eq!(
            recorder.kinds(),
            [
                MetaKind::FirstListener,
                MetaKind::AddListener,
                MetaKind::RemoveListener,
                MetaKind::NoListeners
            ]
        );
        assert_eq!(host.hooks.entries(), ["activate:ping", "deactivate:ping"]);
    }
}
