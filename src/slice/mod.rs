//! Selector-scoped subscriptions on top of a [`Store`](crate::Store).
//!
//! A slice pairs a selector with the last value it produced. After each
//! committed update the selector runs against the new snapshot and the
//! slice's callback fires only when the result differs under the slice's
//! [`Equality`] policy.

mod equality;
mod slice;

pub use equality::{by, By, Equality, Identical, Identity, Structural};
pub use slice::SliceSubscription;
