//! The store core: one state value, atomic patches, ordered listeners.
//!
//! The store knows nothing about selectors or rendering. It commits a new
//! [`Snapshot`] per update and calls every registered listener once,
//! synchronously, in registration order.

mod config;
mod listener;
mod store;

pub use config::StoreConfig;
pub use listener::Subscription;
pub(crate) use listener::Listener;
pub use store::{create_store, create_store_with_config, Patch, Snapshot, Store};
