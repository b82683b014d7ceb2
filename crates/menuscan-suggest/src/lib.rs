//! Location-aware restaurant suggestions.
//!
//! Turns a nearby-places query into a ranked, cached, confidence-tiered
//! suggestion set. [`SuggestionController`] is the entry point; the ranking,
//! cache and classifier are exposed for direct use and testing.

pub mod cache;
pub mod classifier;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod ranking;
pub mod store;

pub use cache::{CacheEntry, CacheLookup, MissReason, SuggestionCache, CACHE_KEY};
pub use classifier::{classify, Classification, ConfidenceTier};
pub use controller::{ControllerConfig, ControllerState, LastError, Phase, SuggestionController};
pub use debounce::SearchDebouncer;
pub use error::SuggestError;
pub use ranking::rank;
pub use store::{FileStore, MemoryStore};
