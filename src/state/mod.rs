//! State shapes the store knows how to patch.
//!
//! The store treats state as a black box except for one operation: a
//! shallow merge of a partial update into the current value. Typed states
//! implement [`Merge`] by hand; [`Record`] is the dynamic field map.

mod merge;
mod record;

pub use merge::Merge;
pub use record::{Field, Record};
