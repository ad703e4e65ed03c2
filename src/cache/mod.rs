//! Cache synchronization subsystem.
//!
//! This module decides how a cached table is refreshed (full rebuild,
//! cursor-based append, or primary-key merge), assembles the parameters
//! that drive refresh-template rendering, executes the refresh and
//! retention logic through an abstract database adapter, and keeps an
//! append-only audit log of sync outcomes.

mod adapter;
mod manager;
mod mode;

pub use adapter::{CacheDatabaseAdapter, QueryResult};
pub use manager::{CacheManager, SyncEvent, SyncStatus, SyncType};
pub use mode::{determine_cache_mode, join_strings, CacheMode};
