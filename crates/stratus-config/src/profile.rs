//! Cloud profiles and per-service key resolution.
//!
//! A profile's config is the fully merged mapping for one cloud and region.
//! Per-service overrides use `{service_type}_{attribute}` keys
//! (`compute_api_version`, `image_endpoint`, ...) and fall back to bare
//! cloud-wide keys (`interface`) or to the profile itself (`region`).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use stratus_session::{Session, SharedAuth};

use crate::cache::SharedProfileStore;

/// Prefix accepted (and ignored) on requested attribute names.
const NAMESPACE_PREFIX: &str = "os_";

/// Key suffixes that mark a service as known to the profile.
const SERVICE_KEY_SUFFIXES: [&str; 3] = ["_api_version", "_service_type", "_service_name"];

pub(crate) const IDENTITY: &str = "identity";
pub(crate) const IMAGE: &str = "image";
pub(crate) const NETWORK: &str = "network";
pub(crate) const OBJECT_STORE: &str = "object-store";

/// Normalize a requested attribute name to config-key form.
///
/// Strips the `os_` namespace prefix and turns dashes into underscores.
pub fn normalize_key(key: &str) -> String {
    key.strip_prefix(NAMESPACE_PREFIX)
        .unwrap_or(key)
        .replace('-', "_")
}

// ─────────────────────────────────────────────────────────────────────────────
// CloudProfile
// ─────────────────────────────────────────────────────────────────────────────

/// One named cloud in one region, with its merged configuration.
pub struct CloudProfile {
    /// Cloud name.
    pub name: String,
    /// Region name.
    pub region: String,
    pub(crate) config: Map<String, Value>,
    force_ipv4: bool,
    pub(crate) auth: Option<SharedAuth>,
    pub(crate) store: Option<SharedProfileStore>,
    pub(crate) session: Mutex<Option<Arc<Session>>>,
}

impl CloudProfile {
    /// Create a profile with no auth capability or profile store bound.
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        config: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            config,
            force_ipv4: false,
            auth: None,
            store: None,
            session: Mutex::new(None),
        }
    }

    /// Bind an auth capability.
    pub fn with_auth(mut self, auth: SharedAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Bind a profile store.
    pub fn with_store(mut self, store: SharedProfileStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Prefer IPv4 over IPv6.
    pub fn with_force_ipv4(mut self, force_ipv4: bool) -> Self {
        self.force_ipv4 = force_ipv4;
        self
    }

    /// The merged config mapping.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Config keys in stored order.
    pub fn keys(&self) -> serde_json::map::Keys<'_> {
        self.config.keys()
    }

    /// Look up any config attribute by name.
    ///
    /// The name is normalized with [`normalize_key`]; config keys are compared
    /// with their dashes turned into underscores. Unknown names are `None`.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        let key = normalize_key(key);
        self.config
            .iter()
            .find(|(k, _)| k.replace('-', "_") == key)
            .map(|(_, v)| v)
    }

    /// The raw `auth` mapping.
    pub fn auth_args(&self) -> Option<&Value> {
        self.config.get("auth")
    }

    /// The bound auth capability.
    pub fn auth(&self) -> Option<&SharedAuth> {
        self.auth.as_ref()
    }

    pub fn force_ipv4(&self) -> bool {
        self.force_ipv4
    }

    pub fn prefer_ipv6(&self) -> bool {
        !self.force_ipv4
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-service resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Cloud-wide interface.
    pub fn default_interface(&self) -> Option<String> {
        self.string("interface")
    }

    /// Interface for a service: `{service}_interface`, then `interface`.
    /// Without a service, the cloud-wide interface.
    pub fn interface(&self, service_type: Option<&str>) -> Option<String> {
        let Some(service_type) = service_type else {
            return self.default_interface();
        };
        self.string(&service_key(service_type, "interface"))
            .or_else(|| self.default_interface())
    }

    /// Region for a service: `{service}_region_name`, then the profile region.
    pub fn region_name(&self, service_type: Option<&str>) -> String {
        service_type
            .and_then(|s| self.string(&service_key(s, "region_name")))
            .unwrap_or_else(|| self.region.clone())
    }

    /// API version for a service, if configured.
    pub fn api_version(&self, service_type: &str) -> Option<String> {
        self.string(&service_key(service_type, "api_version"))
    }

    /// Catalog service type: `{service}_service_type`, then the service itself.
    pub fn service_type(&self, service_type: &str) -> String {
        self.string(&service_key(service_type, "service_type"))
            .unwrap_or_else(|| service_type.to_string())
    }

    /// Catalog service name, if configured.
    pub fn service_name(&self, service_type: &str) -> Option<String> {
        self.string(&service_key(service_type, "service_name"))
    }

    /// Explicit endpoint override, if configured.
    pub fn endpoint(&self, service_type: &str) -> Option<String> {
        self.string(&service_key(service_type, "endpoint"))
    }

    /// Services this profile has per-service settings for.
    pub fn services(&self) -> BTreeSet<String> {
        self.config
            .keys()
            .filter(|key| SERVICE_KEY_SUFFIXES.iter().any(|s| key.ends_with(s)))
            .map(|key| {
                let parts: Vec<&str> = key.split('_').collect();
                parts[..parts.len() - 2].join("_")
            })
            .collect()
    }

    /// A config value rendered as a string; `null` is absent.
    pub(crate) fn string(&self, key: &str) -> Option<String> {
        self.config.get(key).and_then(value_as_string)
    }
}

fn service_key(service_type: &str, attribute: &str) -> String {
    format!("{}_{}", service_type, attribute)
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl PartialEq for CloudProfile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.region == other.region && self.config == other.config
    }
}

impl fmt::Debug for CloudProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudProfile")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("config", &self.config)
            .field("force_ipv4", &self.force_ipv4)
            .field("auth", &self.auth.is_some())
            .field("store", &self.store.is_some())
            .field("session", &self.session.lock().is_some())
            .finish()
    }
}

impl<'a> IntoIterator for &'a CloudProfile {
    type Item = &'a String;
    type IntoIter = serde_json::map::Keys<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.config.keys()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
