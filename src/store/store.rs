use super::listener::{ListenerHost, ListenerRegistry};
use super::{Listener, StoreConfig, Subscription};
use crate::error::Result;
use crate::state::{Merge, Record};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

struct Versioned<S> {
    version: u64,
    state: S,
}

/// An immutable committed state.
///
/// Each committed update produces a new snapshot with a version one higher
/// than the last; the initial state is version 0. Snapshots are cheap to
/// clone and never change after they are created. Derefs to the state.
pub struct Snapshot<S>(Arc<Versioned<S>>);

impl<S> Snapshot<S> {
    /// Position of this snapshot in the store's commit sequence.
    pub fn version(&self) -> u64 {
        self.0.version
    }

    /// Borrow the state. Handy where `Deref` needs a type hint.
    pub fn state(&self) -> &S {
        &self.0.state
    }

    /// Whether both snapshots are the same commit.
    pub fn ptr_eq(&self, other: &Snapshot<S>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<S> Clone for Snapshot<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S> Deref for Snapshot<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0.state
    }
}

impl<S: fmt::Debug> fmt::Debug for Snapshot<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.0.version)
            .field("state", &self.0.state)
            .finish()
    }
}

/// A change to apply to the state.
///
/// Either a literal partial, or a function that derives the partial from
/// the current state. The function form is only ever called once, with
/// the state the update is applied to.
pub enum Patch<'a, S: Merge> {
    Partial(S::Partial),
    Compute(Box<dyn FnOnce(&S) -> S::Partial + 'a>),
}

impl<'a, S: Merge> Patch<'a, S> {
    /// Wrap a literal partial.
    pub fn partial(partial: S::Partial) -> Self {
        Patch::Partial(partial)
    }

    /// Wrap a function of the current state.
    pub fn compute<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S::Partial + 'a,
    {
        Patch::Compute(Box::new(f))
    }

    /// Resolve to a partial against `state`.
    pub fn resolve(self, state: &S) -> S::Partial {
        match self {
            Patch::Partial(partial) => partial,
            Patch::Compute(f) => f(state),
        }
    }
}

impl Patch<'_, Record> {
    /// Build a literal patch from untyped JSON.
    ///
    /// Anything other than a JSON object is rejected with
    /// [`StoreError::InvalidPatch`](crate::StoreError::InvalidPatch).
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Record::patch_from_json(value).map(Patch::Partial)
    }
}

struct StoreInner<S> {
    config: StoreConfig,
    state: ArcSwap<Versioned<S>>,
    listeners: Mutex<ListenerRegistry<S>>,
}

impl<S: Send + Sync> ListenerHost for StoreInner<S> {
    fn remove_listener(&self, id: u64) -> bool {
        let removed = self.listeners.lock().remove(id);
        if removed {
            debug!(store = %self.config.name, listener_id = id, "listener removed");
        }
        removed
    }
}

/// An observable state container.
///
/// `Store` owns one state value of type `S`. [`set_state`](Store::set_state)
/// is the only mutator: it shallow-merges a patch into the current state,
/// commits the result as a new [`Snapshot`], then calls every listener
/// once, synchronously, in the order they subscribed.
///
/// Reads are wait-free. Writes are not serialized internally: callers that
/// update one store from several threads must serialize those calls
/// themselves.
///
/// Cloning a `Store` yields another handle to the same state.
///
/// # Examples
///
/// ```
/// use slice_store::{create_store, Record};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let store = create_store(Record::new().with("counter", 0));
/// let calls = Arc::new(AtomicUsize::new(0));
///
/// let subscription = store.subscribe({
///     let calls = calls.clone();
///     move || {
///         calls.fetch_add(1, Ordering::SeqCst);
///     }
/// });
///
/// store.set_partial(Record::new().with("counter", 1));
/// assert_eq!(store.get_state().value("counter"), Some(&1.into()));
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
///
/// subscription.unsubscribe();
/// store.set_partial(Record::new().with("counter", 2));
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Store<S>
where
    S: Merge + Send + Sync + 'static,
{
    /// Create a store with the given initial state.
    pub fn new(initial: S) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    /// Create a store with an explicit configuration.
    pub fn with_config(initial: S, config: StoreConfig) -> Self {
        debug!(store = %config.name, "store created");
        Self {
            inner: Arc::new(StoreInner {
                config,
                state: ArcSwap::from_pointee(Versioned {
                    version: 0,
                    state: initial,
                }),
                listeners: Mutex::new(ListenerRegistry::new()),
            }),
        }
    }

    /// The most recently committed state.
    pub fn get_state(&self) -> Snapshot<S> {
        Snapshot(self.inner.state.load_full())
    }

    /// Version of the most recently committed state.
    pub fn version(&self) -> u64 {
        self.inner.state.load().version
    }

    /// Read the current state without taking a snapshot handle.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let guard = self.inner.state.load();
        f(&guard.state)
    }

    /// Apply a patch and notify every listener.
    ///
    /// The new state is committed before any listener runs, so a listener
    /// that calls [`get_state`](Store::get_state) sees it. The listeners
    /// called are the ones registered when notification begins: listeners
    /// added or removed during the pass only affect later updates.
    ///
    /// A listener may call `set_state` itself; the nested update runs its
    /// own complete pass before the outer pass continues. Panics raised by
    /// listeners propagate to the caller, and the committed state stays.
    pub fn set_state(&self, patch: Patch<'_, S>) {
        let current = self.inner.state.load_full();
        let partial = patch.resolve(&current.state);
        let next = Arc::new(Versioned {
            version: current.version + 1,
            state: current.state.merge(partial),
        });
        self.inner.state.store(Arc::clone(&next));

        let listeners = self.inner.listeners.lock().snapshot();
        trace!(
            store = %self.inner.config.name,
            version = next.version,
            listeners = listeners.len(),
            "state committed"
        );

        let snapshot = Snapshot(next);
        for listener in &listeners {
            listener(&snapshot);
        }
    }

    /// Shorthand for `set_state(Patch::Partial(partial))`.
    pub fn set_partial(&self, partial: S::Partial) {
        self.set_state(Patch::Partial(partial));
    }

    /// Shorthand for `set_state(Patch::compute(f))`.
    pub fn set_with<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S::Partial,
    {
        self.set_state(Patch::compute(f));
    }

    /// Register a listener called after every committed update.
    ///
    /// The returned [`Subscription`] removes the listener when it is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_snapshot(Arc::new(move |_: &Snapshot<S>| listener()))
    }

    /// Register a listener that receives the snapshot that triggered it.
    pub(crate) fn subscribe_snapshot(&self, listener: Listener<S>) -> Subscription {
        let id = self.inner.listeners.lock().insert(listener);
        debug!(store = %self.inner.config.name, listener_id = id, "listener added");
        let weak = Arc::downgrade(&self.inner);
        let host: Weak<dyn ListenerHost> = weak;
        Subscription::new(id, host)
    }

    /// Drop every listener. The state is kept.
    ///
    /// Outstanding [`Subscription`] handles become inert.
    pub fn dispose(&self) {
        let removed = self.inner.listeners.lock().clear();
        debug!(store = %self.inner.config.name, removed, "store disposed");
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// The configuration the store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.config.name)
            .field("version", &self.inner.state.load().version)
            .finish_non_exhaustive()
    }
}

/// Create a store with the given initial state.
///
/// # Example
///
/// ```
/// use slice_store::{create_store, Record};
///
/// let store = create_store(Record::new().with("theme", "light"));
/// store.set_with(|_| Record::new().with("theme", "dark"));
/// assert_eq!(store.get_state().value("theme"), Some(&"dark".into()));
/// ```
pub fn create_store<S>(initial: S) -> Store<S>
where
    S: Merge + Send + Sync + 'static,
{
    Store::new(initial)
}

/// Create a store with explicit configuration.
pub fn create_store_with_config<S>(initial: S, config: StoreConfig) -> Store<S>
where
    S: Merge + Send + Sync + 'static,
{
    Store::with_config(initial, config)
}
