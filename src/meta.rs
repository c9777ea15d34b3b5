use std::{fmt, sync::Arc};

use crate::{EventName, ListenerId, Result};

/// The four built-in lifecycle events every [`EventMeta`](crate::EventMeta) carries.
///
/// | Kind | Fires when | Listener id |
/// |------|------------|-------------|
/// | [`FirstListener`](Self::FirstListener) | the event goes from zero listeners to one, before `AddListener` | the new listener |
/// | [`AddListener`](Self::AddListener) | a listener is added | the new listener |
/// | [`RemoveListener`](Self::RemoveListener) | a listener is removed | the removed listener |
/// | [`NoListeners`](Self::NoListeners) | the last listener is removed, after `RemoveListener` | none |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MetaKind {
    FirstListener,
    AddListener,
    RemoveListener,
    NoListeners,
}

impl MetaKind {
    pub const ALL: [MetaKind; 4] = [
        MetaKind::FirstListener,
        MetaKind::AddListener,
        MetaKind::RemoveListener,
        MetaKind::NoListeners,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKind::FirstListener => "first_listener",
            MetaKind::AddListener => "add_listener",
            MetaKind::RemoveListener => "remove_listener",
            MetaKind::NoListeners => "no_listeners",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to meta-listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetaEvent {
    kind: MetaKind,
    event: EventName,
    listener: Option<ListenerId>,
}

impl MetaEvent {
    pub(crate) fn new(kind: MetaKind, event: EventName, listener: Option<ListenerId>) -> Self {
        Self {
            kind,
            event,
            listener,
        }
    }

    pub fn kind(&self) -> MetaKind {
        self.kind
    }

    /// The user event whose listener set changed.
    pub fn event(&self) -> &EventName {
        &self.event
    }

    /// The listener added or removed; `None` for [`MetaKind::NoListeners`].
    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }
}

impl fmt::Display for MetaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.listener {
            Some(id) => write!(f, "{}({}, {})", self.kind, self.event, id),
            None => write!(f, "{}({})", self.kind, self.event),
        }
    }
}

pub(crate) type MetaFn = dyn Fn(&MetaEvent) -> Result<()> + Send + Sync;

/// A meta-listener slot. Meta channels never fire meta-events of their own.
#[derive(Clone)]
pub(crate) struct MetaEntry {
    pub(crate) id: ListenerId,
    pub(crate) once: bool,
    pub(crate) call: Arc<MetaFn>,
}

/// The four meta-event channels of one event.
#[derive(Default)]
pub(crate) struct MetaChannels {
    channels: [Vec<MetaEntry>; 4],
}

impl MetaChannels {
    pub(crate) fn push(&mut self, kind: MetaKind, entry: MetaEntry) {
        self.channels[kind.index()].push(entry);
    }

    pub(crate) fn remove(&mut self, kind: MetaKind, id: ListenerId) -> bool {
        let channel = &mut self.channels[kind.index()];
        let before = channel.len();
        channel.retain(|e| e.id != id);
        channel.len() != before
    }

    /// Snapshot the channel for dispatch, dropping `once` entries from it.
    pub(crate) fn take_for_dispatch(&mut self, kind: MetaKind) -> Vec<MetaEntry> {
        let channel = &mut self.channels[kind.index()];
        let snapshot = channel.clone();
        channel.retain(|e| !e.once);
        snapshot
    }

    pub(crate) fn len(&self, kind: MetaKind) -> usize {
        self.channels[kind.index()].len()
    }
}
