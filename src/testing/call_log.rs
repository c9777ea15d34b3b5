use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::Listener;

/// Shared, ordered log of labels pushed by listeners.
///
/// Clones share the same log, so one clone can be moved into listeners while
/// the test keeps another for assertions.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Snapshot of everything pushed so far, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// A listener that pushes `label` every time it runs.
    pub fn listener<O: 'static, A: 'static>(&self, label: impl Into<String>) -> Listener<O, A> {
        let log = self.clone();
        let label = label.into();
        Listener::new(move |_, _| {
            log.push(label.clone());
            Ok(())
        })
    }
}

impl fmt::Debug for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.lock().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let log = CallLog::new();
        let other = log.clone();
        other.push("a");
        log.push("b");
        other.push("a");

        assert_eq!(log.entries(), ["a", "b", "a"]);
        assert_eq!(log.count("a"), 2);
        assert_eq!(log.len(), 3);

        log.clear();
        assert!(other.is_empty());
    }
}
