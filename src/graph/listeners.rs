//! Copy-on-write listener registration.
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A list of listeners that can be changed while it is being notified.
///
/// Writers swap in a new vector; notification iterates a snapshot, so a
/// listener may add or remove listeners (itself included) from its callback.
/// Changes made during a notification take effect from the next one.
pub struct ListenerList<L: ?Sized> {
    entries: RwLock<Arc<Vec<Arc<L>>>>,
}

impl<L: ?Sized> ListenerList<L> {
    pub fn new() -> Self {
        Self { entries: RwLock::new(Arc::new(Vec::new())) }
    }

    pub fn add(&self, listener: Arc<L>) {
        let mut entries = self.entries.write();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push(listener);
        *entries = Arc::new(next);
    }

    /// Removes `listener` (compared by address). Returns false if it was not registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut entries = self.entries.write();
        let Some(pos) = entries
            .iter()
            .position(|entry| std::ptr::addr_eq(Arc::as_ptr(entry), Arc::as_ptr(listener)))
        else {
            return false;
        };
        let mut next = Vec::clone(&entries);
        next.remove(pos);
        *entries = Arc::new(next);
        true
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<L>>> {
        Arc::clone(&self.entries.read())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for ListenerList<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList").field("len", &self.len()).finish()
    }
}
