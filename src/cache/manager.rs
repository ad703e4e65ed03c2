//! Cache refresh orchestration.
//!
//! The manager assembles the parameter bag that drives template rendering,
//! asks the adapter to render and execute the refresh statement, applies
//! retention, and records an audit event. Refresh, invalidation, and audit
//! logging never fail their caller: every failure on those paths is caught,
//! logged, and at most downgraded to an error-status audit entry.

use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::adapter::CacheDatabaseAdapter;
use super::mode::{determine_cache_mode, join_strings, CacheMode};
use crate::config::{CacheConfig, CoreConfig, EndpointConfig};
use crate::error::{Error, Result};
use crate::ParamBag;

/// Audit log table kept inside the cache schema.
const SYNC_LOG_TABLE: &str = "__cache_sync_log";

/// Outcome of a resilient cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
  Success,
  Error,
}

impl SyncStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      SyncStatus::Success => "success",
      SyncStatus::Error => "error",
    }
  }
}

/// What a sync event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
  Full,
  Append,
  Merge,
  /// Retention/expiry pass over old snapshots.
  GarbageCollection,
}

impl From<CacheMode> for SyncType {
  fn from(mode: CacheMode) -> Self {
    match mode {
      CacheMode::Full => SyncType::Full,
      CacheMode::Append => SyncType::Append,
      CacheMode::Merge => SyncType::Merge,
    }
  }
}

impl SyncType {
  pub fn as_str(&self) -> &'static str {
    match self {
      SyncType::Full => "full",
      SyncType::Append => "append",
      SyncType::Merge => "merge",
      SyncType::GarbageCollection => "garbage_collection",
    }
  }
}

impl fmt::Display for SyncType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Append-only audit record for one refresh attempt.
#[derive(Debug, Clone)]
pub struct SyncEvent {
  pub sync_type: SyncType,
  pub status: SyncStatus,
  pub message: String,
  pub timestamp: chrono::DateTime<Utc>,
}

/// Orchestrates cache refresh cycles against an abstract database adapter.
///
/// Holds no mutable state; all per-call data lives on the stack. Concurrent
/// refreshes for the same table are not serialized here, that is the
/// scheduler's job.
pub struct CacheManager {
  adapter: Arc<dyn CacheDatabaseAdapter>,
  config: Arc<CoreConfig>,
}

impl CacheManager {
  pub fn new(adapter: Arc<dyn CacheDatabaseAdapter>, config: Arc<CoreConfig>) -> Self {
    Self { adapter, config }
  }

  /// Inject cache location params so a read query's template can reference
  /// the materialized cache table. No-op when the cache is disabled.
  pub fn add_query_cache_params_if_necessary(&self, cache: &CacheConfig, params: &mut ParamBag) {
    if !cache.enabled {
      return;
    }
    params.insert("cacheCatalog".to_string(), self.config.catalog.clone());
    params.insert("cacheSchema".to_string(), cache.schema.clone());
    params.insert("cacheTable".to_string(), cache.table.clone());
  }

  /// Run one refresh cycle for an endpoint's cache.
  ///
  /// Never fails the caller: adapter errors are absorbed into the returned
  /// status and the audit log. A failed snapshot-metadata query falls back
  /// to a wall-clock timestamp rather than blocking the refresh.
  pub fn refresh_ducklake_cache(
    &self,
    endpoint: &EndpointConfig,
    params: &mut ParamBag,
  ) -> SyncStatus {
    let cache = &endpoint.cache;
    if !cache.enabled {
      debug!(endpoint = %endpoint.url_path, "cache disabled, skipping refresh");
      return SyncStatus::Success;
    }

    let mode = self.build_refresh_params(cache, params);
    self.add_snapshot_params(params);

    let mut status = SyncStatus::Success;
    let mut message = format!("cache {}.{} refreshed", cache.schema, cache.table);

    if let Err(e) = self.render_and_execute(endpoint, cache, params) {
      error!(
        endpoint = %endpoint.url_path,
        table = %cache.table,
        error = %e,
        "cache refresh failed"
      );
      status = SyncStatus::Error;
      message = format!("cache refresh failed: {}", e);
    } else {
      info!(
        endpoint = %endpoint.url_path,
        table = %cache.table,
        mode = %mode,
        "cache refreshed"
      );
    }

    // Retention runs independently of whether the refresh itself worked.
    self.apply_retention(cache);

    self.record_sync_event(cache, mode.into(), status, &message);
    status
  }

  /// Refresh every enabled cache once, sequentially. Used at startup so the
  /// first read request does not hit an empty cache table.
  pub fn warm_up(&self, endpoints: &[EndpointConfig]) {
    info!("warming up endpoint caches, this might take some time");
    for endpoint in endpoints.iter().filter(|e| e.cache.enabled) {
      let mut params = ParamBag::new();
      self.refresh_ducklake_cache(endpoint, &mut params);
    }
    info!("finished warming up endpoint caches");
  }

  /// Mark a cache stale after a successful client write.
  ///
  /// Safe no-op when the cache is disabled; never fails. The cache is not
  /// re-materialized here, the next scheduled refresh picks it up.
  pub fn invalidate_cache(&self, cache: &CacheConfig) {
    if !cache.enabled {
      debug!("cache disabled, invalidation is a no-op");
      return;
    }
    let mode = determine_cache_mode(cache);
    info!(table = %cache.table, schema = %cache.schema, "cache invalidated by write");
    self.record_sync_event(
      cache,
      mode.into(),
      SyncStatus::Success,
      "cache invalidated by write, awaiting next refresh",
    );
  }

  /// Append a sync event to the audit log through the adapter.
  ///
  /// Any adapter failure is caught and discarded; logging must never fail
  /// its caller.
  pub fn record_sync_event(
    &self,
    cache: &CacheConfig,
    sync_type: SyncType,
    status: SyncStatus,
    message: &str,
  ) {
    let event = SyncEvent {
      sync_type,
      status,
      message: message.to_string(),
      timestamp: Utc::now(),
    };
    if let Err(e) = self.append_sync_event(cache, &event) {
      warn!(table = %cache.table, error = %e, "failed to record sync event, continuing");
    }
  }

  /// Steps 1-5 of a refresh: assemble the parameter bag and pick the mode.
  fn build_refresh_params(&self, cache: &CacheConfig, params: &mut ParamBag) -> CacheMode {
    params.insert("cacheCatalog".to_string(), self.config.catalog.clone());
    params.insert("cacheSchema".to_string(), cache.schema.clone());
    params.insert("cacheTable".to_string(), cache.table.clone());

    let mode = determine_cache_mode(cache);
    params.insert("cacheMode".to_string(), mode.as_str().to_string());

    if let Some(schedule) = &cache.schedule {
      params.insert("cacheSchedule".to_string(), schedule.clone());
    }
    if let Some(cursor) = &cache.cursor {
      params.insert("cursorColumn".to_string(), cursor.column.clone());
      params.insert("cursorType".to_string(), cursor.type_name.clone());
    }
    if !cache.primary_keys.is_empty() {
      params.insert(
        "primaryKeys".to_string(),
        join_strings(&cache.primary_keys, ","),
      );
    }
    mode
  }

  /// Step 6: snapshot metadata, with a wall-clock fallback on any failure.
  ///
  /// The previous snapshot, when one exists, is the natural lower bound
  /// for a cursor-append window.
  fn add_snapshot_params(&self, params: &mut ParamBag) {
    match self.query_snapshot_metadata() {
      Ok(metadata) => {
        if let Some(id) = metadata.snapshot_id {
          params.insert("cacheSnapshotId".to_string(), id);
        }
        params.insert("cacheSnapshotTimestamp".to_string(), metadata.snapshot_time);
        if let Some(id) = metadata.previous_snapshot_id {
          params.insert("previousSnapshotId".to_string(), id);
        }
        if let Some(time) = metadata.previous_snapshot_time {
          params.insert("previousSnapshotTimestamp".to_string(), time);
        }
      }
      Err(e) => {
        warn!(error = %e, "snapshot metadata unavailable, falling back to wall clock");
        params.insert(
          "cacheSnapshotTimestamp".to_string(),
          Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
      }
    }
  }

  fn query_snapshot_metadata(&self) -> Result<SnapshotMetadata> {
    let query = format!(
      "SELECT snapshot_id, snapshot_time FROM {}.snapshots() ORDER BY snapshot_id DESC LIMIT 2",
      self.config.catalog
    );
    let result = self
      .adapter
      .execute_ducklake_query_with_result(&query)
      .map_err(|e| Error::SnapshotQuery(e.to_string()))?;

    if result.is_empty() {
      return Err(Error::SnapshotQuery("no snapshot metadata returned".into()));
    }

    let snapshot_time = result
      .value(0, "snapshot_time")
      .map(value_to_string)
      .ok_or_else(|| Error::SnapshotQuery("snapshot_time column missing".into()))?;

    Ok(SnapshotMetadata {
      snapshot_id: result.value(0, "snapshot_id").map(value_to_string),
      snapshot_time,
      previous_snapshot_id: result.value(1, "snapshot_id").map(value_to_string),
      previous_snapshot_time: result.value(1, "snapshot_time").map(value_to_string),
    })
  }

  /// Steps 7-8: render the refresh statement and execute it.
  fn render_and_execute(
    &self,
    endpoint: &EndpointConfig,
    cache: &CacheConfig,
    params: &ParamBag,
  ) -> Result<()> {
    let sql = self.adapter.render_cache_template(endpoint, cache, params)?;
    debug!(sql = %sql, "executing cache refresh statement");
    self.adapter.execute_ducklake_query(&sql, params)
  }

  /// Step 9: version-count-bounded and/or age-bounded snapshot expiry.
  /// Both may fire in the same refresh; neither fires when unset. Records
  /// its own garbage-collection audit entry.
  fn apply_retention(&self, cache: &CacheConfig) {
    let retention = &cache.retention;
    if !retention.is_configured() {
      return;
    }

    let mut status = SyncStatus::Success;
    let mut notes: Vec<String> = Vec::new();

    if let Some(keep) = retention.keep_last_snapshots {
      let query = format!(
        "CALL ducklake_expire_snapshots('{}', retain_last => {})",
        self.config.catalog, keep
      );
      match self.adapter.execute_ducklake_query(&query, &ParamBag::new()) {
        Ok(()) => notes.push(format!("kept last {} snapshots", keep)),
        Err(e) => {
          warn!(table = %cache.table, error = %e, "snapshot count expiry failed");
          status = SyncStatus::Error;
          notes.push(format!("snapshot count expiry failed: {}", e));
        }
      }
    }

    if let Some(age) = &retention.max_snapshot_age {
      let query = format!(
        "CALL ducklake_expire_snapshots('{}', older_than => now() - INTERVAL '{}')",
        self.config.catalog, age
      );
      match self.adapter.execute_ducklake_query(&query, &ParamBag::new()) {
        Ok(()) => notes.push(format!("expired snapshots older than {}", age)),
        Err(e) => {
          warn!(table = %cache.table, error = %e, "snapshot age expiry failed");
          status = SyncStatus::Error;
          notes.push(format!("snapshot age expiry failed: {}", e));
        }
      }
    }

    self.record_sync_event(
      cache,
      SyncType::GarbageCollection,
      status,
      &notes.join("; "),
    );
  }

  fn append_sync_event(&self, cache: &CacheConfig, event: &SyncEvent) -> Result<()> {
    let log_table = format!(
      "{}.{}.{}",
      self.config.catalog, cache.schema, SYNC_LOG_TABLE
    );

    let create = format!(
      "CREATE TABLE IF NOT EXISTS {} (cache_table VARCHAR, sync_type VARCHAR, status VARCHAR, message VARCHAR, created_at VARCHAR)",
      log_table
    );
    self.adapter.execute_ducklake_query(&create, &ParamBag::new())?;

    let insert = format!(
      "INSERT INTO {} (cache_table, sync_type, status, message, created_at) VALUES ('{}', '{}', '{}', '{}', '{}')",
      log_table,
      sql_quote(&cache.table),
      event.sync_type.as_str(),
      event.status.as_str(),
      sql_quote(&event.message),
      event.timestamp.format("%Y-%m-%d %H:%M:%S"),
    );
    self.adapter.execute_ducklake_query(&insert, &ParamBag::new())
  }
}

/// Latest (and, when present, previous) snapshot of the store.
struct SnapshotMetadata {
  snapshot_id: Option<String>,
  snapshot_time: String,
  previous_snapshot_id: Option<String>,
  previous_snapshot_time: Option<String>,
}

/// Render a metadata value the way it should appear in a template.
fn value_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn sql_quote(text: &str) -> String {
  text.replace('\'', "''")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::adapter::QueryResult;
  use crate::config::{CursorConfig, RetentionConfig};
  use serde_json::json;
  use std::sync::Mutex;

  /// Adapter double that records every call and fails on demand.
  #[derive(Default)]
  struct MockAdapter {
    rendered: Mutex<Vec<ParamBag>>,
    executed: Mutex<Vec<String>>,
    /// Newest first; empty makes the metadata query fail.
    snapshots: Vec<(i64, &'static str)>,
    fail_execute: bool,
    fail_all: bool,
  }

  impl MockAdapter {
    fn executed(&self) -> Vec<String> {
      self.executed.lock().unwrap().clone()
    }

    fn last_rendered_params(&self) -> ParamBag {
      self.rendered.lock().unwrap().last().cloned().unwrap_or_default()
    }
  }

  impl CacheDatabaseAdapter for MockAdapter {
    fn render_cache_template(
      &self,
      _endpoint: &EndpointConfig,
      _cache: &CacheConfig,
      params: &ParamBag,
    ) -> crate::Result<String> {
      if self.fail_all {
        return Err(Error::Template("render refused".into()));
      }
      self.rendered.lock().unwrap().push(params.clone());
      Ok("CREATE OR REPLACE TABLE cache_table AS SELECT 1".to_string())
    }

    fn execute_ducklake_query(&self, query: &str, _params: &ParamBag) -> crate::Result<()> {
      if self.fail_all || self.fail_execute {
        return Err(Error::AdapterExecution("engine refused".into()));
      }
      self.executed.lock().unwrap().push(query.to_string());
      Ok(())
    }

    fn execute_ducklake_query_with_result(&self, query: &str) -> crate::Result<QueryResult> {
      if self.fail_all || self.snapshots.is_empty() {
        return Err(Error::AdapterExecution("snapshots() not available".into()));
      }
      self.executed.lock().unwrap().push(query.to_string());
      Ok(QueryResult {
        columns: vec!["snapshot_id".to_string(), "snapshot_time".to_string()],
        rows: self
          .snapshots
          .iter()
          .take(2)
          .map(|(id, time)| vec![json!(id), json!(time)])
          .collect(),
      })
    }
  }

  fn test_config() -> Arc<CoreConfig> {
    Arc::new(CoreConfig {
      catalog: "lake".to_string(),
      ..Default::default()
    })
  }

  fn cached_endpoint(cache: CacheConfig) -> EndpointConfig {
    EndpointConfig {
      url_path: "/customers".to_string(),
      template_source: "customers.sql".to_string(),
      cache,
      ..Default::default()
    }
  }

  fn enabled_cache() -> CacheConfig {
    CacheConfig {
      enabled: true,
      table: "customers_cache".to_string(),
      schema: "analytics".to_string(),
      ..Default::default()
    }
  }

  fn manager(adapter: Arc<MockAdapter>) -> CacheManager {
    CacheManager::new(adapter, test_config())
  }

  #[test]
  fn test_query_params_noop_when_disabled() {
    let manager = manager(Arc::new(MockAdapter::default()));
    let mut params = ParamBag::new();
    manager.add_query_cache_params_if_necessary(&CacheConfig::default(), &mut params);
    assert!(params.is_empty());
  }

  #[test]
  fn test_query_params_filled_when_enabled() {
    let manager = manager(Arc::new(MockAdapter::default()));
    let mut params = ParamBag::new();
    manager.add_query_cache_params_if_necessary(&enabled_cache(), &mut params);
    assert_eq!(params.get("cacheTable").unwrap(), "customers_cache");
    assert_eq!(params.get("cacheSchema").unwrap(), "analytics");
    assert_eq!(params.get("cacheCatalog").unwrap(), "lake");
  }

  #[test]
  fn test_refresh_assembles_schedule_and_cursor_params() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(7, "2026-01-02 03:04:05"), (6, "2026-01-01 12:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut cache = enabled_cache();
    cache.schedule = Some("6h".to_string());
    cache.cursor = Some(CursorConfig {
      column: "updated_at".to_string(),
      type_name: "timestamp".to_string(),
    });
    let endpoint = cached_endpoint(cache);

    let mut params = ParamBag::new();
    let status = manager.refresh_ducklake_cache(&endpoint, &mut params);
    assert_eq!(status, SyncStatus::Success);

    let rendered = adapter.last_rendered_params();
    assert_eq!(rendered.get("cacheSchedule").unwrap(), "6h");
    assert_eq!(rendered.get("cursorColumn").unwrap(), "updated_at");
    assert_eq!(rendered.get("cursorType").unwrap(), "timestamp");
    assert_eq!(rendered.get("cacheMode").unwrap(), "append");
    assert_eq!(rendered.get("cacheSnapshotId").unwrap(), "7");
    assert_eq!(
      rendered.get("cacheSnapshotTimestamp").unwrap(),
      "2026-01-02 03:04:05"
    );
    assert_eq!(rendered.get("previousSnapshotId").unwrap(), "6");
    assert_eq!(
      rendered.get("previousSnapshotTimestamp").unwrap(),
      "2026-01-01 12:00:00"
    );
  }

  #[test]
  fn test_single_snapshot_sets_no_previous_params() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&cached_endpoint(enabled_cache()), &mut params);

    let rendered = adapter.last_rendered_params();
    assert_eq!(rendered.get("cacheSnapshotId").unwrap(), "1");
    assert!(!rendered.contains_key("previousSnapshotId"));
    assert!(!rendered.contains_key("previousSnapshotTimestamp"));
  }

  #[test]
  fn test_refresh_primary_keys_select_merge_mode() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut cache = enabled_cache();
    cache.cursor = Some(CursorConfig {
      column: "updated_at".to_string(),
      type_name: "timestamp".to_string(),
    });
    cache.primary_keys = vec!["id".to_string(), "tenant_id".to_string()];
    let endpoint = cached_endpoint(cache);

    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&endpoint, &mut params);

    let rendered = adapter.last_rendered_params();
    assert_eq!(rendered.get("cacheMode").unwrap(), "merge");
    assert_eq!(rendered.get("primaryKeys").unwrap(), "id,tenant_id");
  }

  #[test]
  fn test_snapshot_failure_falls_back_and_still_executes() {
    // No snapshots makes the metadata query fail.
    let adapter = Arc::new(MockAdapter::default());
    let manager = manager(adapter.clone());

    let mut params = ParamBag::new();
    let status = manager.refresh_ducklake_cache(&cached_endpoint(enabled_cache()), &mut params);
    assert_eq!(status, SyncStatus::Success);

    let rendered = adapter.last_rendered_params();
    assert!(rendered.contains_key("cacheSnapshotTimestamp"));
    assert!(!rendered.contains_key("cacheSnapshotId"));
    // The refresh statement was still executed.
    assert!(adapter
      .executed()
      .iter()
      .any(|q| q.starts_with("CREATE OR REPLACE TABLE")));
  }

  #[test]
  fn test_refresh_execution_failure_downgrades_to_error_status() {
    let adapter = Arc::new(MockAdapter {
      fail_execute: true,
      ..Default::default()
    });
    let manager = manager(adapter);

    let mut params = ParamBag::new();
    let status = manager.refresh_ducklake_cache(&cached_endpoint(enabled_cache()), &mut params);
    assert_eq!(status, SyncStatus::Error);
  }

  #[test]
  fn test_retention_count_bound_statement() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut cache = enabled_cache();
    cache.retention = RetentionConfig {
      keep_last_snapshots: Some(5),
      max_snapshot_age: None,
    };
    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&cached_endpoint(cache), &mut params);

    let expiry: Vec<_> = adapter
      .executed()
      .into_iter()
      .filter(|q| q.contains("ducklake_expire_snapshots"))
      .collect();
    assert_eq!(expiry.len(), 1);
    assert!(expiry[0].contains("retain_last"));
    assert!(expiry[0].contains('5'));
  }

  #[test]
  fn test_retention_age_bound_statement() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut cache = enabled_cache();
    cache.retention = RetentionConfig {
      keep_last_snapshots: None,
      max_snapshot_age: Some("7 days".to_string()),
    };
    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&cached_endpoint(cache), &mut params);

    let expiry: Vec<_> = adapter
      .executed()
      .into_iter()
      .filter(|q| q.contains("ducklake_expire_snapshots"))
      .collect();
    assert_eq!(expiry.len(), 1);
    assert!(expiry[0].contains("older_than"));
    assert!(expiry[0].contains("7 days"));
  }

  #[test]
  fn test_both_retention_bounds_fire_in_one_refresh() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut cache = enabled_cache();
    cache.retention = RetentionConfig {
      keep_last_snapshots: Some(3),
      max_snapshot_age: Some("30 days".to_string()),
    };
    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&cached_endpoint(cache), &mut params);

    let expiry: Vec<_> = adapter
      .executed()
      .into_iter()
      .filter(|q| q.contains("ducklake_expire_snapshots"))
      .collect();
    assert_eq!(expiry.len(), 2);
  }

  #[test]
  fn test_no_retention_config_issues_no_expiry() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&cached_endpoint(enabled_cache()), &mut params);

    assert!(adapter
      .executed()
      .iter()
      .all(|q| !q.contains("ducklake_expire_snapshots")));
  }

  #[test]
  fn test_sync_event_recorded_for_successful_refresh() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let mut params = ParamBag::new();
    manager.refresh_ducklake_cache(&cached_endpoint(enabled_cache()), &mut params);

    let log_statements: Vec<_> = adapter
      .executed()
      .into_iter()
      .filter(|q| q.contains(SYNC_LOG_TABLE))
      .collect();
    assert!(log_statements.iter().any(|q| q.starts_with("CREATE TABLE IF NOT EXISTS")));
    assert!(log_statements
      .iter()
      .any(|q| q.contains("'full'") && q.contains("'success'")));
  }

  #[test]
  fn test_record_sync_event_swallows_adapter_failure() {
    let adapter = Arc::new(MockAdapter {
      fail_all: true,
      ..Default::default()
    });
    let manager = manager(adapter);

    // Must not panic or propagate anything.
    manager.record_sync_event(
      &enabled_cache(),
      SyncType::Full,
      SyncStatus::Error,
      "it's broken",
    );
  }

  #[test]
  fn test_refresh_never_fails_even_when_everything_does() {
    let adapter = Arc::new(MockAdapter {
      fail_all: true,
      ..Default::default()
    });
    let manager = manager(adapter);

    let mut cache = enabled_cache();
    cache.retention.keep_last_snapshots = Some(2);
    let mut params = ParamBag::new();
    let status = manager.refresh_ducklake_cache(&cached_endpoint(cache), &mut params);
    assert_eq!(status, SyncStatus::Error);
  }

  #[test]
  fn test_invalidate_disabled_cache_touches_nothing() {
    let adapter = Arc::new(MockAdapter::default());
    let manager = manager(adapter.clone());

    manager.invalidate_cache(&CacheConfig::default());
    assert!(adapter.executed().is_empty());
  }

  #[test]
  fn test_invalidate_enabled_cache_records_event() {
    let adapter = Arc::new(MockAdapter::default());
    let manager = manager(adapter.clone());

    manager.invalidate_cache(&enabled_cache());
    assert!(adapter
      .executed()
      .iter()
      .any(|q| q.contains(SYNC_LOG_TABLE) && q.contains("invalidated")));
  }

  #[test]
  fn test_warm_up_refreshes_only_enabled_caches() {
    let adapter = Arc::new(MockAdapter {
      snapshots: vec![(1, "2026-01-01 00:00:00")],
      ..Default::default()
    });
    let manager = manager(adapter.clone());

    let endpoints = vec![
      cached_endpoint(enabled_cache()),
      cached_endpoint(CacheConfig::default()),
    ];
    manager.warm_up(&endpoints);

    assert_eq!(adapter.rendered.lock().unwrap().len(), 1);
  }
}
