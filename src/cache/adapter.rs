//! Database adapter seam for the cache subsystem.
//!
//! This trait is the only way the cache manager talks to the underlying
//! SQL engine, so mode selection, parameter assembly, fallback behavior,
//! and retention logic can all be exercised with a test double.

use serde_json::Value;

use crate::config::{CacheConfig, EndpointConfig};
use crate::error::Result;
use crate::ParamBag;

/// Operations the cache manager needs from the underlying engine.
pub trait CacheDatabaseAdapter: Send + Sync {
  /// Render the cache-refresh template for an endpoint with the given
  /// parameter bag.
  fn render_cache_template(
    &self,
    endpoint: &EndpointConfig,
    cache: &CacheConfig,
    params: &ParamBag,
  ) -> Result<String>;

  /// Execute a statement against the snapshot-versioned store, discarding
  /// any result.
  fn execute_ducklake_query(&self, query: &str, params: &ParamBag) -> Result<()>;

  /// Execute a statement against the snapshot-versioned store and return
  /// its result rows.
  fn execute_ducklake_query_with_result(&self, query: &str) -> Result<QueryResult>;
}

/// Column-ordered result of a metadata query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
  pub columns: Vec<String>,
  pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Look up a value by row index and column name.
  pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
    let index = self.columns.iter().position(|c| c == column)?;
    self.rows.get(row)?.get(index)
  }
}
