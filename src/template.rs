//! SQL template rendering.
//!
//! Templates are plain SQL files with `{{namespace.key}}` tokens that are
//! substituted literally in a single pass. There are no conditionals, loops,
//! or nested evaluation; the rendered text is otherwise opaque to the
//! engine and never parsed or validated as SQL.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{CacheConfig, CoreConfig, EndpointConfig};
use crate::error::{Error, Result};
use crate::ParamBag;

/// Mapping from cache-prefixed param-bag keys to `cache.*` template keys.
const CACHE_KEY_MAP: &[(&str, &str)] = &[
  ("catalog", "cacheCatalog"),
  ("schema", "cacheSchema"),
  ("table", "cacheTable"),
  ("mode", "cacheMode"),
  ("schedule", "cacheSchedule"),
  ("snapshotId", "cacheSnapshotId"),
  ("snapshotTimestamp", "cacheSnapshotTimestamp"),
  ("previousSnapshotId", "previousSnapshotId"),
  ("previousSnapshotTimestamp", "previousSnapshotTimestamp"),
  ("cursorColumn", "cursorColumn"),
  ("cursorType", "cursorType"),
  ("primaryKeys", "primaryKeys"),
];

/// Renders SQL template files against a parameter bag.
pub struct SqlTemplateProcessor {
  config: Arc<CoreConfig>,
  token: Regex,
  env_allow: Vec<Regex>,
}

impl SqlTemplateProcessor {
  pub fn new(config: Arc<CoreConfig>) -> Self {
    let env_allow = config
      .template
      .environment_whitelist
      .iter()
      .filter_map(|pattern| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
          warn!(pattern = %pattern, error = %e, "skipping invalid environment whitelist pattern");
          None
        }
      })
      .collect();

    Self {
      config,
      // Single-pass literal token grammar: {{namespace.key}}
      token: Regex::new(r"\{\{\s*([A-Za-z]+)\.([A-Za-z0-9_]+)\s*\}\}").unwrap(),
      env_allow,
    }
  }

  /// Render the endpoint's primary template (normal query execution).
  pub fn render(&self, endpoint: &EndpointConfig, params: &ParamBag) -> Result<String> {
    let path = self.full_template_path(&endpoint.template_source);
    let content = self.load_template_content(&path)?;
    Ok(self.substitute(&content, endpoint, params))
  }

  /// Render the cache-refresh template: `cache.template_file` if set,
  /// otherwise the endpoint's primary template.
  pub fn render_cache(
    &self,
    endpoint: &EndpointConfig,
    cache: &CacheConfig,
    params: &ParamBag,
  ) -> Result<String> {
    let path = match &cache.template_file {
      Some(file) => {
        let p = self.full_template_path(file);
        debug!(path = %p.display(), "using cache template file");
        p
      }
      None => {
        let p = self.full_template_path(&endpoint.template_source);
        debug!(path = %p.display(), "using endpoint template file");
        p
      }
    };
    let content = self.load_template_content(&path)?;
    Ok(self.substitute(&content, endpoint, params))
  }

  fn load_template_content(&self, path: &Path) -> Result<String> {
    if !path.exists() {
      return Err(Error::TemplateNotFound(path.display().to_string()));
    }
    std::fs::read_to_string(path)
      .map_err(|e| Error::Template(format!("failed to read {}: {}", path.display(), e)))
  }

  fn full_template_path(&self, source: &str) -> PathBuf {
    let source_path = Path::new(source);
    if source_path.is_absolute() {
      return source_path.to_path_buf();
    }
    self.config.template.path.join(source_path)
  }

  fn substitute(&self, content: &str, endpoint: &EndpointConfig, params: &ParamBag) -> String {
    self
      .token
      .replace_all(content, |caps: &regex::Captures| {
        let namespace = &caps[1];
        let key = &caps[2];
        self.resolve(namespace, key, endpoint, params)
      })
      .into_owned()
  }

  /// Resolve a single token. Unresolved tokens render as empty, never as
  /// an error; a template that needs a default must pre-populate the bag.
  fn resolve(
    &self,
    namespace: &str,
    key: &str,
    endpoint: &EndpointConfig,
    params: &ParamBag,
  ) -> String {
    match namespace {
      "params" => params.get(key).cloned().unwrap_or_default(),
      "conn" => self.resolve_connection(key, endpoint),
      "env" => self.resolve_env(key),
      "cache" => CACHE_KEY_MAP
        .iter()
        .find(|(cache_key, _)| *cache_key == key)
        .and_then(|(_, bag_key)| params.get(*bag_key))
        .cloned()
        .unwrap_or_default(),
      _ => {
        debug!(namespace = %namespace, key = %key, "unknown template namespace, rendering empty");
        String::new()
      }
    }
  }

  /// Properties of the endpoint's first declared connection.
  fn resolve_connection(&self, key: &str, endpoint: &EndpointConfig) -> String {
    endpoint
      .connection
      .first()
      .and_then(|name| self.config.connections.get(name))
      .and_then(|conn| conn.properties.get(key))
      .cloned()
      .unwrap_or_default()
  }

  /// Environment variables render only when their name matches the
  /// configured allow-list. Non-matching or unset names render empty;
  /// this is a security boundary, never an error.
  fn resolve_env(&self, key: &str) -> String {
    if !self.env_allow.iter().any(|re| re.is_match(key)) {
      return String::new();
    }
    std::env::var(key).unwrap_or_default()
  }
}
