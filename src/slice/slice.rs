use super::{Equality, Identical, Identity};
use crate::state::Merge;
use crate::store::{Snapshot, Store, Subscription};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// Last value a slice handed out, and the version it was computed for.
struct Cached<T> {
    version: u64,
    value: T,
}

/// Re-evaluates one selector against committed snapshots.
struct SliceObserver<S, T, Sel, E> {
    cached: Arc<Mutex<Cached<T>>>,
    selector: Sel,
    equality: E,
    _state: PhantomData<fn(&S)>,
}

impl<S, T, Sel, E> SliceObserver<S, T, Sel, E>
where
    Sel: Fn(&S) -> T,
    E: Equality<T>,
{
    /// Bring the cache up to `snapshot`. Returns whether the value changed.
    ///
    /// Snapshots no newer than the cached version are ignored, so a pass
    /// that resumes after a nested update cannot roll the cache back.
    fn observe(&self, snapshot: &Snapshot<S>) -> bool {
        let version = snapshot.version();
        if self.cached.lock().version >= version {
            return false;
        }

        // The selector runs unlocked so it may read the store freely.
        let next = (self.selector)(snapshot.state());

        let mut cached = self.cached.lock();
        if cached.version >= version {
            return false;
        }
        cached.version = version;
        if self.equality.equals(&cached.value, &next) {
            return false;
        }
        cached.value = next;
        true
    }
}

/// A live selector subscription.
///
/// Holds the derived value last computed for the store and keeps the
/// notify callback registered until [`unsubscribe`](Self::unsubscribe) is
/// called or the handle is dropped.
///
/// After every committed update, the selector is applied to the new state
/// and compared with the cached value. The notify callback runs exactly
/// once when they differ and not at all when they are equal, however many
/// other fields the update touched.
#[must_use = "dropping a SliceSubscription stops change notifications"]
pub struct SliceSubscription<T> {
    cached: Arc<Mutex<Cached<T>>>,
    subscription: Subscription,
}

impl<T: Clone> SliceSubscription<T> {
    /// The current derived value.
    pub fn get(&self) -> T {
        self.cached.lock().value.clone()
    }
}

impl<T> SliceSubscription<T> {
    /// Borrow the current derived value.
    ///
    /// `f` runs under the slice's lock and must not touch the store.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cached.lock().value)
    }

    /// Store version the cached value was last checked against.
    pub fn version(&self) -> u64 {
        self.cached.lock().version
    }

    /// Stop observing. Idempotent.
    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
    }

    /// False once the slice has been unsubscribed or its store dropped.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SliceSubscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cached.lock();
        f.debug_struct("SliceSubscription")
            .field("value", &cached.value)
            .field("version", &cached.version)
            .field("active", &self.subscription.is_active())
            .finish()
    }
}

impl<S> Store<S>
where
    S: Merge + Send + Sync + 'static,
{
    /// Observe a slice of the state, compared by identity.
    ///
    /// `notify` runs synchronously from inside the update that changed the
    /// slice, so it may re-enter the store.
    ///
    /// # Examples
    ///
    /// ```
    /// use slice_store::{create_store, Field, Record};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let store = create_store(Record::new().with("counter", 0).with("theme", "light"));
    /// let renders = Arc::new(AtomicUsize::new(0));
    ///
    /// let counter = store.use_slice(|s: &Record| s.get("counter"), {
    ///     let renders = renders.clone();
    ///     move || {
    ///         renders.fetch_add(1, Ordering::SeqCst);
    ///     }
    /// });
    ///
    /// store.set_partial(Record::new().with("counter", 1));
    /// assert_eq!(renders.load(Ordering::SeqCst), 1);
    /// assert_eq!(counter.get(), Some(Field::new(1)));
    ///
    /// store.set_partial(Record::new().with("theme", "dark"));
    /// assert_eq!(renders.load(Ordering::SeqCst), 1);
    /// ```
    pub fn use_slice<T, Sel, N>(&self, selector: Sel, notify: N) -> SliceSubscription<T>
    where
        T: Identical + Send + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        N: Fn() + Send + Sync + 'static,
    {
        self.use_slice_with(selector, Identity, notify)
    }

    /// Observe a slice of the state under an explicit [`Equality`] policy.
    pub fn use_slice_with<T, Sel, E, N>(
        &self,
        selector: Sel,
        equality: E,
        notify: N,
    ) -> SliceSubscription<T>
    where
        T: Send + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        E: Equality<T>,
        N: Fn() + Send + Sync + 'static,
    {
        let snapshot = self.get_state();
        let cached = Arc::new(Mutex::new(Cached {
            version: snapshot.version(),
            value: selector(snapshot.state()),
        }));
        let observer = Arc::new(SliceObserver {
            cached: Arc::clone(&cached),
            selector,
            equality,
            _state: PhantomData,
        });

        let subscription = self.subscribe_snapshot(Arc::new({
            let observer = Arc::clone(&observer);
            let store = self.config().name.clone();
            move |snapshot: &Snapshot<S>| {
                if observer.observe(snapshot) {
                    trace!(store = %store, version = snapshot.version(), "slice changed");
                    notify();
                }
            }
        }));
        debug!(
            store = %self.config().name,
            listener_id = subscription.id(),
            version = snapshot.version(),
            "slice subscribed"
        );

        // An update may have landed between the initial read and the
        // registration; catch up without notifying, since the caller has
        // not read the value yet.
        let latest = self.get_state();
        if latest.version() > snapshot.version() {
            observer.observe(&latest);
        }

        SliceSubscription {
            cached,
            subscription,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::{by, Structural};
    use crate::state::Record;
    use crate::store::create_store;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = count.clone();
        (count, move || {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn demo_store() -> Store<Record> {
        create_store(
            Record::new()
                .with("user", json!({ "name": "Alice", "email": "alice@example.com" }))
                .with("theme", "light")
                .with("counter", 0)
                .with("notifications", json!([])),
        )
    }

    #[test]
    fn initial_value_is_selected_from_current_state() {
        let store = demo_store();
        let (_, notify) = counter();
        let theme = store.use_slice(|s: &Record| s.get("theme"), notify);
        assert_eq!(theme.get().unwrap().as_str(), Some("light"));
        assert_eq!(theme.version(), 0);
    }

    #[test]
    fn unrelated_update_leaves_object_slice_quiet() {
        let store = demo_store();
        let (renders, notify) = counter();
        let _user = store.use_slice(|s: &Record| s.get("user"), notify);

        store.set_partial(Record::new().with("counter", 1));
        store.set_partial(Record::new().with("theme", "dark"));

        assert_eq!(renders.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn replacing_object_with_equal_copy_notifies_under_identity() {
        let store = demo_store();
        let (renders, notify) = counter();
        let _user = store.use_slice(|s: &Record| s.get("user"), notify);

        store.set_partial(Record::new().with("user", json!({ "name": "Alice", "email": "alice@example.com" })));
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn structural_policy_ignores_equal_copies() {
        let store = demo_store();
        let (renders, notify) = counter();
        let _user = store.use_slice_with(
            |s: &Record| s.value("user").cloned(),
            Structural,
            notify,
        );

        store.set_partial(Record::new().with("user", json!({ "name": "Alice", "email": "alice@example.com" })));
        assert_eq!(renders.load(Ordering::SeqCst), 0);

        store.set_partial(Record::new().with("user", json!({ "name": "Diana", "email": "diana@example.com" })));
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn setting_same_scalar_twice_notifies_once() {
        let store = demo_store();
        let (renders, notify) = counter();
        let _theme = store.use_slice(|s: &Record| s.get("theme"), notify);

        store.set_partial(Record::new().with("theme", "dark"));
        store.set_partial(Record::new().with("theme", "dark"));
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn custom_policy_controls_notifications() {
        let store = demo_store();
        let (renders, notify) = counter();
        let bucket = store.use_slice_with(
            |s: &Record| s.value("counter").and_then(|v| v.as_i64()).unwrap_or_default(),
            by(|a: &i64, b: &i64| a / 10 == b / 10),
            notify,
        );

        for n in 1..=9 {
            store.set_partial(Record::new().with("counter", n));
        }
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(bucket.get(), 0);

        store.set_partial(Record::new().with("counter", 10));
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(bucket.get(), 10);
    }

    #[test]
    fn equal_result_does_not_replace_cached_value() {
        let store = demo_store();
        let (_, notify) = counter();
        let slice = store.use_slice_with(
            |s: &Record| s.value("counter").cloned(),
            by(|_: &Option<serde_json::Value>, _: &Option<serde_json::Value>| true),
            notify,
        );

        store.set_partial(Record::new().with("counter", 5));
        assert_eq!(slice.get(), Some(json!(0)));
        assert_eq!(slice.version(), 1);
    }

    #[test]
    fn nested_update_does_not_roll_back_cache() {
        let store = demo_store();
        let (renders, notify) = counter();

        // Registered first, so its nested update runs before the slice
        // sees the outer snapshot.
        let _redirect = store.subscribe({
            let store = store.clone();
            move || {
                let counter = store.get_state().value("counter").and_then(|v| v.as_i64());
                if counter == Some(1) {
                    store.set_partial(Record::new().with("counter", 2));
                }
            }
        });
        let slice = store.use_slice(|s: &Record| s.get("counter"), notify);

        store.set_partial(Record::new().with("counter", 1));

        assert_eq!(slice.get().unwrap().as_i64(), Some(2));
        assert_eq!(slice.version(), store.version());
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notify_may_read_store() {
        let store = demo_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _slice = store.use_slice(|s: &Record| s.get("counter"), {
            let store = store.clone();
            let seen = seen.clone();
            move || {
                let value = store.get_state().value("counter").and_then(|v| v.as_i64());
                seen.lock().push(value);
            }
        });

        store.set_with(|s| {
            let next = s.value("counter").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
            Record::new().with("counter", next)
        });
        assert_eq!(*seen.lock(), vec![Some(1)]);
    }

    #[test]
    fn dropping_slice_removes_listener() {
        let store = demo_store();
        let (_, notify) = counter();
        let slice = store.use_slice(|s: &Record| s.get("counter"), notify);
        assert_eq!(store.listener_count(), 1);

        drop(slice);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn with_borrows_cached_value() {
        let store = demo_store();
        let (_, notify) = counter();
        let user = store.use_slice(|s: &Record| s.get("user"), notify);

        let name = user.with(|field| {
            field
                .as_ref()
                .and_then(|f| f["name"].as_str().map(str::to_string))
        });
        assert_eq!(name.as_deref(), Some("Alice"));
        assert!(user.is_active());
    }
}
