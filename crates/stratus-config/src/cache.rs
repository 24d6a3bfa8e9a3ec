//! Cache policy shared across profiles.
//!
//! Profiles never own cache settings; they delegate to an optional
//! [`ProfileStore`] bound at construction. [`CacheSettings`] is the store
//! loaded from the `cache:` section of a YAML config:
//!
//! ```yaml
//! cache:
//!   max_age: 300
//!   path: ~/.cache/stratus
//!   class: dogpile.cache.memory
//!   arguments:
//!     filename: /tmp/cache.dbm
//!   expiration:
//!     server: 5
//!     image: "7200"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CloudProfile, ConfigError, Result};

/// Cache backend used when none is configured.
pub const DEFAULT_CACHE_CLASS: &str = "dogpile.cache.null";

/// Application name for the default cache directory.
const APP_NAME: &str = "stratus";

// ─────────────────────────────────────────────────────────────────────────────
// ProfileStore
// ─────────────────────────────────────────────────────────────────────────────

/// Source of cache policy shared by every profile of a loader.
pub trait ProfileStore: Send + Sync + std::fmt::Debug {
    /// Default expiration time in seconds.
    fn cache_expiration_time(&self) -> u64;

    /// Directory for on-disk caches.
    fn cache_path(&self) -> PathBuf;

    /// Cache backend class name.
    fn cache_class(&self) -> String;

    /// Backend-specific arguments.
    fn cache_arguments(&self) -> Map<String, Value>;

    /// Per-resource expiration times.
    fn cache_expiration(&self) -> Map<String, Value>;
}

/// Shared profile store.
pub type SharedProfileStore = Arc<dyn ProfileStore>;

// ─────────────────────────────────────────────────────────────────────────────
// CacheSettings
// ─────────────────────────────────────────────────────────────────────────────

/// Cache policy read from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CacheSettings {
    /// Default expiration time in seconds.
    #[serde(alias = "max_age", alias = "max-age", alias = "expiration-time")]
    pub expiration_time: u64,

    /// Cache directory; `~/` is expanded.
    pub path: Option<PathBuf>,

    /// Cache backend class name.
    pub class: String,

    /// Backend-specific arguments.
    pub arguments: Map<String, Value>,

    /// Per-resource expiration times in seconds.
    pub expiration: Map<String, Value>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            expiration_time: 0,
            path: None,
            class: DEFAULT_CACHE_CLASS.to_string(),
            arguments: Map::new(),
            expiration: Map::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    cache: CacheSettings,
}

impl CacheSettings {
    /// Parse the `cache:` section of a YAML document.
    ///
    /// A document without one yields the defaults.
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        if yaml_str.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<CacheDocument>(yaml_str)
            .map(|doc| doc.cache)
            .map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Load from a YAML file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&contents)
    }

    /// Wrap in an `Arc` for binding to profiles.
    pub fn shared(self) -> SharedProfileStore {
        Arc::new(self)
    }
}

impl ProfileStore for CacheSettings {
    fn cache_expiration_time(&self) -> u64 {
        self.expiration_time
    }

    fn cache_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => expand_path(path),
            None => dirs::cache_dir()
                .map(|d| d.join(APP_NAME))
                .unwrap_or_else(|| PathBuf::from(format!(".{}-cache", APP_NAME))),
        }
    }

    fn cache_class(&self) -> String {
        self.class.clone()
    }

    fn cache_arguments(&self) -> Map<String, Value> {
        self.arguments.clone()
    }

    fn cache_expiration(&self) -> Map<String, Value> {
        self.expiration.clone()
    }
}

/// Expand ~ to home directory in paths.
fn expand_path(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if let Some(rest) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile delegation
// ─────────────────────────────────────────────────────────────────────────────

impl CloudProfile {
    pub fn cache_expiration_time(&self) -> Option<u64> {
        self.store.as_ref().map(|s| s.cache_expiration_time())
    }

    pub fn cache_path(&self) -> Option<PathBuf> {
        self.store.as_ref().map(|s| s.cache_path())
    }

    pub fn cache_class(&self) -> Option<String> {
        self.store.as_ref().map(|s| s.cache_class())
    }

    pub fn cache_arguments(&self) -> Option<Map<String, Value>> {
        self.store.as_ref().map(|s| s.cache_arguments())
    }

    pub fn cache_expiration(&self) -> Option<Map<String, Value>> {
        self.store.as_ref().map(|s| s.cache_expiration())
    }

    /// Expiration time for one resource type, in seconds.
    ///
    /// Returns `default` when no store is bound or the resource has no entry.
    pub fn cache_resource_expiration(
        &self,
        resource: &str,
        default: Option<f64>,
    ) -> Result<Option<f64>> {
        let Some(expiration) = self.cache_expiration() else {
            return Ok(default);
        };
        let Some(value) = expiration.get(resource) else {
            return Ok(default);
        };

        let seconds = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        seconds.map(Some).ok_or_else(|| ConfigError::InvalidValue {
            key: format!("cache.expiration.{}", resource),
            message: format!("expected seconds, got {}", value),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
