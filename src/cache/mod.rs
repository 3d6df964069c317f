//! Cache module for keeping view payloads between runs
//!
//! This module provides a TTL cache that persists entries to a durable
//! key/value store. Entries are fresh for a fixed window after capture and
//! are never served once stale. Every operation is best-effort: a broken
//! store degrades the cache to always-miss instead of failing the caller.

mod clock;
mod manager;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{CacheEntry, CacheManager, DEFAULT_NAMESPACE};
pub use store::{FileStore, MemoryStore, Store, StoreError};
