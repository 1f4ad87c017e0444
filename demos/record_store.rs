//! Driving a dynamic `Record` store from JSON patches.

use serde_json::json;
use slice_store::{create_store, Patch, Record, Structural};
use tracing_subscriber::EnvFilter;

fn main() -> slice_store::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== Record Store ===\n");

    let store = create_store(Record::from_json(json!({
        "theme": "light",
        "counter": 0,
        "notifications": [],
    }))?);

    // Rebuilt arrays are new allocations, so compare them structurally.
    let notifications = store.use_slice_with(
        |s: &Record| s.value("notifications").cloned(),
        Structural,
        || println!("   [slice] notifications changed"),
    );

    let patches = [
        json!({ "counter": 1 }),
        json!({ "notifications": [] }),
        json!({ "notifications": ["saved"] }),
        json!({ "theme": "dark", "counter": 2 }),
    ];

    for patch in patches {
        println!("1. Applying {patch}");
        store.set_state(Patch::from_json(patch)?);
        println!("   state v{}: {}", store.version(), store.get_state().to_json());
    }

    println!("\n2. Rejecting a malformed patch");
    match Patch::<Record>::from_json(json!(["not", "an", "object"])) {
        Ok(_) => println!("   unexpectedly accepted"),
        Err(err) => println!("   {err}"),
    }

    println!("\nNotifications: {:?}", notifications.get());
    Ok(())
}
