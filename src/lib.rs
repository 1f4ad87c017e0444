//! # Slice Store
//!
//! An observable state store with selector-scoped subscriptions.
//!
//! Consumers subscribe to a *slice* of the state through a selector and are
//! only told about updates that change that slice, instead of every
//! consumer hearing about every update.
//!
//! ## Store (core)
//!
//! - `Store<S>` - one state value, patched by shallow merge
//! - `Patch<S>` - a literal partial or a function of the current state
//! - `Subscription` - disposer for a raw listener
//!
//! ## Slices (selector subscriptions)
//!
//! - `SliceSubscription<T>` - cached derived value plus a notify callback
//! - `Equality` policies: `Identity` (default), `Structural`, `by(fn)`
//!
//! ## State shapes
//!
//! - `Merge` - implement for your own state types
//! - `Record` - a dynamic field map backed by JSON values
//!
//! Everything is synchronous: an update runs every listener before it
//! returns.

pub mod error;
pub mod slice;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use error::{Result, StoreError};
pub use slice::{Equality, Identical, Identity, SliceSubscription, Structural};
pub use state::{Field, Merge, Record};
pub use store::{
    create_store, create_store_with_config, Patch, Snapshot, Store, StoreConfig, Subscription,
};
