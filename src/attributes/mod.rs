//! Tag collections and the deduplicating attribute index

pub mod index;
pub mod tags;

pub use index::{AttributeIndex, IndexMode, StringInterning, EMPTY_ID, NULL_ID};
pub use tags::Tags;
