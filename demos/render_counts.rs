//! Selector slices versus broadcast subscribers, counted in "renders".
//!
//! Three displays (user, theme, counter) watch the same store twice: once
//! through plain subscribers that re-render on every update, once through
//! slices that re-render only when their field changes. A controls panel
//! then increments the counter, switches to the dark theme, and changes
//! the user.
//!
//! Run with `RUST_LOG=slice_store=trace` to see the store's events.

use serde_json::json;
use slice_store::{create_store_with_config, Record, SliceSubscription, StoreConfig, Subscription};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Display {
    label: &'static str,
    renders: Arc<AtomicUsize>,
}

impl Display {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn render_callback(&self) -> impl Fn() + Send + Sync + 'static {
        let renders = Arc::clone(&self.renders);
        move || {
            renders.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== Shared State: Slices vs Broadcast ===\n");

    let store = create_store_with_config(
        Record::new()
            .with("user", json!({ "name": "Alice", "email": "alice@example.com" }))
            .with("theme", "light")
            .with("counter", 0)
            .with("notifications", json!([])),
        StoreConfig::named("shared"),
    );

    let broadcast: Vec<Display> = ["user", "theme", "counter"]
        .into_iter()
        .map(Display::new)
        .collect();
    let sliced: Vec<Display> = ["user", "theme", "counter"]
        .into_iter()
        .map(Display::new)
        .collect();

    // Broadcast: every consumer hears every update.
    let _broadcast_subs: Vec<Subscription> = broadcast
        .iter()
        .map(|display| store.subscribe(display.render_callback()))
        .collect();

    // Slices: each consumer selects its own field.
    let slices: Vec<SliceSubscription<Option<slice_store::Field>>> = sliced
        .iter()
        .map(|display| {
            let key = display.label;
            store.use_slice(move |s: &Record| s.get(key), display.render_callback())
        })
        .collect();

    println!("1. Increment counter");
    store.set_with(|s| {
        let counter = s.value("counter").and_then(|v| v.as_i64()).unwrap_or(0);
        Record::new().with("counter", counter + 1)
    });
    report(&broadcast, &sliced);

    println!("\n2. Set dark theme");
    store.set_partial(Record::new().with("theme", "dark"));
    report(&broadcast, &sliced);

    println!("\n3. Set dark theme again (no change)");
    store.set_partial(Record::new().with("theme", "dark"));
    report(&broadcast, &sliced);

    println!("\n4. Change user");
    store.set_partial(
        Record::new().with("user", json!({ "name": "Diana", "email": "diana@example.com" })),
    );
    report(&broadcast, &sliced);

    println!("\nFinal slice values:");
    for (display, slice) in sliced.iter().zip(&slices) {
        let value = slice.get().map(|field| field.value().to_string());
        println!("   {:<8} {}", display.label, value.unwrap_or_default());
    }

    println!("\nFinal state: {}", store.get_state().to_json());
}

fn report(broadcast: &[Display], sliced: &[Display]) {
    println!("   {:<8} {:>10} {:>8}", "display", "broadcast", "slice");
    for (b, s) in broadcast.iter().zip(sliced) {
        println!("   {:<8} {:>10} {:>8}", b.label, b.renders(), s.renders());
    }
}
