//! Configuration model for endpoints, caches, and the engine itself.
//!
//! All configuration is immutable once loaded. A reload produces a fresh
//! snapshot; components hold `Arc` references and in-flight calls keep
//! using the snapshot they captured.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};
use crate::interval::parse_interval;

/// Engine-wide configuration: the lakehouse catalog alias, the template
/// root, named connections, and template rendering settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
  /// Alias under which the snapshot-versioned catalog is attached.
  pub catalog: String,
  pub template: TemplateConfig,
  pub connections: BTreeMap<String, ConnectionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
  /// Root directory that relative template paths resolve against.
  pub path: PathBuf,
  /// Regex patterns for environment variables templates may read.
  /// Anything not matching renders as empty.
  #[serde(rename = "environment-whitelist")]
  pub environment_whitelist: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
  /// Free-form properties exposed to templates as `conn.*`.
  pub properties: BTreeMap<String, String>,
  /// SQL executed once when a database handle is opened.
  pub init: Option<String>,
}

/// Per-endpoint cache settings.
///
/// `cursor` and `primary_keys` are independent, non-exclusive settings;
/// together they determine the synchronization mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  pub table: String,
  pub schema: String,
  pub cursor: Option<CursorConfig>,
  #[serde(rename = "primary-keys")]
  pub primary_keys: Vec<String>,
  /// Informational refresh schedule (e.g. "6h"). Recorded for templates
  /// and auditing; triggering is an external scheduler's job.
  pub schedule: Option<String>,
  pub retention: RetentionConfig,
  /// Refresh statement template. Falls back to the endpoint template.
  #[serde(rename = "template-file")]
  pub template_file: Option<String>,
  /// Mark the cache stale after a successful write to this endpoint.
  #[serde(rename = "invalidate-on-write")]
  pub invalidate_on_write: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CursorConfig {
  pub column: String,
  #[serde(rename = "type")]
  pub type_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
  #[serde(rename = "keep-last-snapshots")]
  pub keep_last_snapshots: Option<u64>,
  /// Age threshold passed verbatim to the engine (e.g. "7 days").
  #[serde(rename = "max-snapshot-age")]
  pub max_snapshot_age: Option<String>,
}

impl RetentionConfig {
  pub fn is_configured(&self) -> bool {
    self.keep_last_snapshots.is_some() || self.max_snapshot_age.is_some()
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
  #[default]
  Read,
  Write,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
  #[serde(rename = "type")]
  pub kind: OperationKind,
  /// Wrap the write statement in begin/commit.
  pub transaction: bool,
  #[serde(rename = "validate-before-write")]
  pub validate_before_write: bool,
}

/// One HTTP/tool endpoint as declared in configuration.
///
/// Created at config load, read-only during request handling.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
  #[serde(rename = "url-path")]
  pub url_path: String,
  pub method: String,
  pub operation: OperationConfig,
  #[serde(rename = "request-fields")]
  pub request_fields: Vec<String>,
  /// Connection names in declaration order; the first one backs `conn.*`.
  pub connection: Vec<String>,
  #[serde(rename = "template-source")]
  pub template_source: String,
  pub cache: CacheConfig,
}

impl CoreConfig {
  /// Load engine configuration from a YAML file.
  pub fn load(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    Self::from_yaml(&contents)
  }

  /// Parse engine configuration from YAML text.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| Error::Config(format!("failed to parse: {}", e)))
  }
}

impl CacheConfig {
  /// Check the configuration for shapes the engine cannot work with.
  ///
  /// An unparsable schedule is only warned about: the engine records the
  /// string for bookkeeping and never interprets it.
  pub fn validate(&self) -> Result<()> {
    if !self.enabled {
      return Ok(());
    }
    if self.table.is_empty() {
      return Err(Error::Config("cache is enabled but no table is set".into()));
    }
    if self.schema.is_empty() {
      return Err(Error::Config(format!(
        "cache table {} has no schema set",
        self.table
      )));
    }
    if let Some(cursor) = &self.cursor {
      if cursor.column.is_empty() {
        return Err(Error::Config(format!(
          "cache table {} has a cursor without a column",
          self.table
        )));
      }
    }
    if self.primary_keys.iter().any(|k| k.is_empty()) {
      return Err(Error::Config(format!(
        "cache table {} has an empty primary key entry",
        self.table
      )));
    }
    if let Some(schedule) = &self.schedule {
      if parse_interval(schedule).is_none() {
        warn!(
          table = %self.table,
          schedule = %schedule,
          "cache schedule does not parse as an interval, recording it verbatim"
        );
      }
    }
    Ok(())
  }
}

impl EndpointConfig {
  pub fn validate(&self) -> Result<()> {
    if self.template_source.is_empty() {
      return Err(Error::Config(format!(
        "endpoint {} has no template source",
        self.url_path
      )));
    }
    self.cache.validate()
  }
}
