//! Cache synchronization and transactional-write engine for SQL query
//! templates backed by a snapshot-versioned ("lakehouse") table store.
//!
//! The engine decides how a cached table is refreshed (full rebuild,
//! cursor-based append, or primary-key merge), renders SQL templates with
//! the parameters that drive that refresh, applies snapshot retention, and
//! coordinates cache invalidation with client writes. Refresh and
//! invalidation never fail the request that triggered them; transactional
//! writes are all-or-nothing.
//!
//! HTTP routing, authentication, response serialization, and the SQL
//! engine itself are external collaborators; the cache subsystem reaches
//! the engine only through [`cache::CacheDatabaseAdapter`].

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod interval;
pub mod template;
pub mod write;

pub use config::{CacheConfig, CoreConfig, EndpointConfig};
pub use error::{Error, Result};

/// Ordered string-keyed parameter mapping threaded through template
/// rendering and execution. Later writers overwrite earlier ones.
pub type ParamBag = std::collections::BTreeMap<String, String>;
