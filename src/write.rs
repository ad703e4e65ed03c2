//! Transactional write path.
//!
//! Renders an endpoint's write template once, executes it once, and on
//! success coordinates cache invalidation. The write itself is the one
//! place in the engine where failure propagates to the caller; the
//! downstream invalidation never does.

use std::sync::Arc;
use tracing::debug;

use crate::cache::CacheManager;
use crate::config::EndpointConfig;
use crate::db::Database;
use crate::error::Result;
use crate::template::SqlTemplateProcessor;
use crate::{CoreConfig, ParamBag};

/// Outcome of one write call. Ephemeral, one per call.
#[derive(Debug, Clone)]
pub struct WriteResult {
  pub rows_affected: u64,
  /// Column names for `returned_data`, in statement order.
  pub columns: Vec<String>,
  /// Rows produced by a result-returning clause. `Some(vec![])` when the
  /// clause matched zero rows, `None` when the statement had no such
  /// clause.
  pub returned_data: Option<Vec<Vec<serde_json::Value>>>,
}

/// Executes endpoint-declared write statements.
pub struct WritePath {
  db: Arc<Database>,
  templates: SqlTemplateProcessor,
  cache: CacheManager,
}

impl WritePath {
  pub fn new(db: Arc<Database>, config: Arc<CoreConfig>) -> Self {
    Self {
      templates: SqlTemplateProcessor::new(config.clone()),
      cache: CacheManager::new(db.clone(), config),
      db,
    }
  }

  /// Execute a write, transactional or not per the endpoint's operation
  /// configuration.
  pub fn execute(&self, endpoint: &EndpointConfig, params: &ParamBag) -> Result<WriteResult> {
    if endpoint.operation.transaction {
      self.execute_write_in_transaction(endpoint, params)
    } else {
      self.execute_write(endpoint, params)
    }
  }

  /// Render the endpoint's write template once and execute it once.
  pub fn execute_write(&self, endpoint: &EndpointConfig, params: &ParamBag) -> Result<WriteResult> {
    let sql = self.templates.render(endpoint, params)?;
    debug!(endpoint = %endpoint.url_path, "executing write statement");
    let result = self.db.execute_statement(&sql)?;
    self.invalidate_if_configured(endpoint);
    Ok(result)
  }

  /// Like [`execute_write`](Self::execute_write), but all-or-nothing: any
  /// execution error triggers rollback before it reaches the caller.
  pub fn execute_write_in_transaction(
    &self,
    endpoint: &EndpointConfig,
    params: &ParamBag,
  ) -> Result<WriteResult> {
    let sql = self.templates.render(endpoint, params)?;
    debug!(endpoint = %endpoint.url_path, "executing transactional write statement");
    let result = self.db.execute_in_transaction(&sql)?;
    self.invalidate_if_configured(endpoint);
    Ok(result)
  }

  /// Invalidation mirrors the cache manager's resilience contract: a
  /// failed invalidation must not turn a successful write into a failed
  /// client response.
  fn invalidate_if_configured(&self, endpoint: &EndpointConfig) {
    if endpoint.cache.invalidate_on_write {
      self.cache.invalidate_cache(&endpoint.cache);
    }
  }
}
