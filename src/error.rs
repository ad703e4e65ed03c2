//! Error types for the sync engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure categories surfaced by the engine.
///
/// Only the transactional write path propagates these to callers; the
/// refresh, invalidation, and audit paths catch everything internally
/// and report through [`crate::cache::SyncStatus`] instead.
#[derive(Debug, Error)]
pub enum Error {
  /// Malformed cache or endpoint configuration.
  #[error("invalid configuration: {0}")]
  Config(String),

  /// The resolved template path does not exist.
  #[error("template file not found: {0}")]
  TemplateNotFound(String),

  /// A template could not be read or rendered.
  #[error("template error: {0}")]
  Template(String),

  /// The underlying engine rejected a statement.
  #[error("statement execution failed: {0}")]
  AdapterExecution(String),

  /// Snapshot metadata could not be queried. Recovered internally with a
  /// wall-clock fallback; never escapes the refresh path.
  #[error("snapshot metadata query failed: {0}")]
  SnapshotQuery(String),

  /// A transactional write failed. Rollback has already run by the time
  /// this reaches the caller.
  #[error("transaction failed: {0}")]
  Transaction(String),
}
