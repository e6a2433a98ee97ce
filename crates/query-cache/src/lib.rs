//! # Query Cache
//!
//! In-process cache for remote reads: keyed entries, deduplicated requests,
//! stale-while-revalidate and prefix invalidation after mutations.

pub mod cache;
pub mod key;
pub mod state;

pub use cache::{QueryCache, Subscription};
pub use key::QueryKey;
pub use state::{QueryState, QueryStatus};
