use crate::store::Snapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Internal listener shape: receives the snapshot that triggered it.
pub(crate) type Listener<S> = Arc<dyn Fn(&Snapshot<S>) + Send + Sync>;

/// Ordered set of listeners keyed by registration id.
pub(crate) struct ListenerRegistry<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

impl<S> ListenerRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, listener: Listener<S>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Returns whether `id` was still registered.
    pub(crate) fn remove(&mut self, id: u64) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Listeners to call for one notification pass, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Listener<S>> {
        self.entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Type-erased view of a store that can drop listeners by id.
pub(crate) trait ListenerHost: Send + Sync {
    fn remove_listener(&self, id: u64) -> bool;
}

/// Disposer for a store listener.
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) removes the listener;
/// further calls do nothing. Dropping the handle unsubscribes as well, so a
/// subscription lives exactly as long as its handle. The handle only holds
/// a weak reference to the store.
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    id: u64,
    host: Weak<dyn ListenerHost>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: u64, host: Weak<dyn ListenerHost>) -> Self {
        Self {
            id,
            host,
            active: AtomicBool::new(true),
        }
    }

    /// Remove the listener from its store. Idempotent.
    ///
    /// Takes effect from the next notification pass; a pass already in
    /// flight still calls the listener.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(host) = self.host.upgrade() {
            host.remove_listener(self.id);
        }
    }

    /// Whether `unsubscribe` has not been called yet.
    ///
    /// A disposed store drops its listeners without flipping this flag.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Registration id, unique within the owning store.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
