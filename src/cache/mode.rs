//! Cache synchronization mode selection.

use std::fmt;

use crate::config::CacheConfig;

/// How a cached table is refreshed.
///
/// Derived from configuration on every call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
  /// Full rebuild of the cache table.
  Full,
  /// Cursor-based incremental append of newer rows.
  Append,
  /// Primary-key upsert of changed rows.
  Merge,
}

impl CacheMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      CacheMode::Full => "full",
      CacheMode::Append => "append",
      CacheMode::Merge => "merge",
    }
  }
}

impl fmt::Display for CacheMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Pick the synchronization mode for a cache configuration.
///
/// Primary keys dominate even when a cursor is also configured: merge
/// requires more information than append and strictly implies it.
pub fn determine_cache_mode(config: &CacheConfig) -> CacheMode {
  if !config.primary_keys.is_empty() {
    CacheMode::Merge
  } else if config.cursor.is_some() {
    CacheMode::Append
  } else {
    CacheMode::Full
  }
}

/// Join values left-to-right in input order, without re-sorting.
pub fn join_strings(values: &[String], separator: &str) -> String {
  values.join(separator)
}
