use super::{EntryListener, SubscriptionId};
use crate::models::{Entry, EntryPatch};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Entry>,
    listeners: Vec<(SubscriptionId, EntryListener)>,
    next_subscription: u64,
}

/// In-memory entry cache with change notification. Cheap to clone; clones
/// share the same entries and listeners.
#[derive(Clone, Default)]
pub(crate) struct EntryCache {
    inner: Rc<RefCell<CacheInner>>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.inner.borrow().entries.get(id).cloned()
    }

    pub fn all(&self) -> Vec<Entry> {
        let mut out: Vec<Entry> = self.inner.borrow().entries.values().cloned().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Insert or replace, notifying listeners when the stored value changed.
    pub fn put(&self, entry: Entry) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.entries.get(&entry.id) == Some(&entry) {
                false
            } else {
                inner.entries.insert(entry.id.clone(), entry.clone());
                true
            }
        };
        if changed {
            self.notify(&entry);
        }
    }

    /// Apply a patch to a cached entry. Returns false if the entry is not cached.
    pub fn apply(&self, id: &str, patch: &EntryPatch) -> bool {
        let Some(mut entry) = self.get(id) else {
            return false;
        };
        patch.apply_to(&mut entry);
        self.put(entry);
        true
    }

    pub fn subscribe(&self, listener: EntryListener) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        inner.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.borrow_mut().listeners.retain(|(sid, _)| *sid != id);
    }

    // Listeners are cloned out first: they may read or write the cache.
    fn notify(&self, entry: &Entry) {
        let listeners: Vec<EntryListener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(entry);
        }
    }
}
