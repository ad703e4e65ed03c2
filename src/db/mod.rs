//! Embedded database handle.
//!
//! Wraps a single SQL engine connection behind a mutex and implements the
//! cache adapter seam on top of it. Statements arrive fully rendered from
//! the template processor; this module never synthesizes refresh SQL.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

use crate::cache::{CacheDatabaseAdapter, QueryResult};
use crate::config::{CacheConfig, CoreConfig, EndpointConfig};
use crate::error::{Error, Result};
use crate::template::SqlTemplateProcessor;
use crate::write::WriteResult;
use crate::ParamBag;

/// Database connection wrapper shared by the cache manager and write path.
pub struct Database {
  conn: Mutex<Connection>,
  templates: SqlTemplateProcessor,
}

impl Database {
  /// Open or create the database at the given path and run connection
  /// init statements from the configuration.
  pub fn open(path: &Path, config: Arc<CoreConfig>) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::AdapterExecution(format!("failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::AdapterExecution(format!("failed to open database at {}: {}", path.display(), e))
    })?;
    Self::from_connection(conn, config)
  }

  /// Open an in-memory database. Used by tests and ephemeral setups.
  pub fn open_in_memory(config: Arc<CoreConfig>) -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::AdapterExecution(format!("failed to open in-memory database: {}", e)))?;
    Self::from_connection(conn, config)
  }

  fn from_connection(conn: Connection, config: Arc<CoreConfig>) -> Result<Self> {
    let db = Self {
      conn: Mutex::new(conn),
      templates: SqlTemplateProcessor::new(config.clone()),
    };
    db.run_init_statements(&config)?;
    Ok(db)
  }

  fn run_init_statements(&self, config: &CoreConfig) -> Result<()> {
    let conn = self.lock()?;
    for (name, connection) in &config.connections {
      if let Some(init) = &connection.init {
        debug!(connection = %name, "executing init statement");
        conn
          .execute_batch(init)
          .map_err(|e| Error::AdapterExecution(format!("init for connection {} failed: {}", name, e)))?;
      }
    }
    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|_| Error::AdapterExecution("connection lock poisoned".into()))
  }

  /// Execute one rendered statement.
  ///
  /// A statement with a result-returning clause yields `returned_data`
  /// (an empty row set when the clause matched zero rows); anything else
  /// yields `None` and the affected-row count.
  pub fn execute_statement(&self, sql: &str) -> Result<WriteResult> {
    let conn = self.lock()?;
    run_statement(&conn, sql)
  }

  /// Execute one rendered statement inside begin/commit.
  ///
  /// All-or-nothing: on any execution error the transaction is rolled
  /// back before the error is returned, so no partial effect is ever
  /// observable.
  pub fn execute_in_transaction(&self, sql: &str) -> Result<WriteResult> {
    let conn = self.lock()?;

    conn
      .execute_batch("BEGIN")
      .map_err(|e| Error::Transaction(format!("failed to begin: {}", e)))?;

    match run_statement(&conn, sql) {
      Ok(result) => {
        conn.execute_batch("COMMIT").map_err(|e| {
          rollback(&conn);
          Error::Transaction(format!("failed to commit: {}", e))
        })?;
        Ok(result)
      }
      Err(e) => {
        rollback(&conn);
        Err(Error::Transaction(e.to_string()))
      }
    }
  }

  /// Run a query and collect its full result set.
  pub fn query(&self, sql: &str) -> Result<QueryResult> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare(sql)
      .map_err(|e| Error::AdapterExecution(e.to_string()))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut out = Vec::new();
    let mut rows = stmt
      .query([])
      .map_err(|e| Error::AdapterExecution(e.to_string()))?;
    while let Some(row) = rows.next().map_err(|e| Error::AdapterExecution(e.to_string()))? {
      let mut values = Vec::with_capacity(column_count);
      for i in 0..column_count {
        let value = row
          .get_ref(i)
          .map_err(|e| Error::AdapterExecution(e.to_string()))?;
        values.push(value_to_json(value));
      }
      out.push(values);
    }

    Ok(QueryResult { columns, rows: out })
  }
}

impl CacheDatabaseAdapter for Database {
  fn render_cache_template(
    &self,
    endpoint: &EndpointConfig,
    cache: &CacheConfig,
    params: &ParamBag,
  ) -> Result<String> {
    self.templates.render_cache(endpoint, cache, params)
  }

  fn execute_ducklake_query(&self, query: &str, _params: &ParamBag) -> Result<()> {
    // Parameters are already substituted into the statement text by the
    // template processor; nothing is bound here.
    let conn = self.lock()?;
    conn
      .execute_batch(query)
      .map_err(|e| Error::AdapterExecution(e.to_string()))
  }

  fn execute_ducklake_query_with_result(&self, query: &str) -> Result<QueryResult> {
    self.query(query)
  }
}

fn run_statement(conn: &Connection, sql: &str) -> Result<WriteResult> {
  let mut stmt = conn
    .prepare(sql)
    .map_err(|e| Error::AdapterExecution(e.to_string()))?;

  // A result-returning clause (RETURNING, or a plain query) shows up as
  // a non-zero column count on the prepared statement.
  if stmt.column_count() > 0 {
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut returned = Vec::new();
    {
      let mut rows = stmt
        .query([])
        .map_err(|e| Error::AdapterExecution(e.to_string()))?;
      while let Some(row) = rows.next().map_err(|e| Error::AdapterExecution(e.to_string()))? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
          let value = row
            .get_ref(i)
            .map_err(|e| Error::AdapterExecution(e.to_string()))?;
          values.push(value_to_json(value));
        }
        returned.push(values);
      }
    }

    Ok(WriteResult {
      rows_affected: conn.changes(),
      columns,
      returned_data: Some(returned),
    })
  } else {
    let affected = stmt
      .execute([])
      .map_err(|e| Error::AdapterExecution(e.to_string()))?;
    Ok(WriteResult {
      rows_affected: affected as u64,
      columns: Vec::new(),
      returned_data: None,
    })
  }
}

fn rollback(conn: &Connection) {
  if let Err(e) = conn.execute_batch("ROLLBACK") {
    error!(error = %e, "rollback failed");
  }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
    ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
  }
}
