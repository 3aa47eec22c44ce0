//! Tag resolution engine.
//!
//! ```text
//! query words → candidates (1..=3-grams) → one task per candidate
//!                                           ↓ exact lookup, else fuzzy scan
//!                     ResolutionResult ← bounded result channel ← EntryCache
//! ```
//!
//! The [`EntryCache`] mirrors a [`TagStore`] and is the only shared mutable state; every
//! write is reconciled against the store before it becomes visible.

pub mod cache;
pub mod candidates;
pub mod dispatcher;
pub mod resolver;
pub mod result;
pub mod similarity;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheError, EntryCache};
pub use dispatcher::MatchDispatcher;
pub use resolver::TagResolver;
pub use result::ResolutionResult;
pub use similarity::{similarity_ratio, MatchPolicy};
pub use store::{StoreError, TagSnapshot, TagStore};
