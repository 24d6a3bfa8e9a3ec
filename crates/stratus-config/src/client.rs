//! Constructor arguments for external service clients.
//!
//! Service client libraries disagree on constructor shape. Instead of calling
//! them directly, a profile assembles a [`ClientRequest`] and hands it to a
//! caller-supplied constructor closure that maps it onto the real library:
//!
//! ```no_run
//! use stratus_config::{ClientRequest, CloudProfile, ConfigError, LegacyClientOptions};
//!
//! struct ComputeClient {
//!     endpoint_type: Option<String>,
//!     version: Option<String>,
//! }
//!
//! # async fn example(profile: &CloudProfile) -> Result<(), ConfigError> {
//! let client = profile
//!     .legacy_client(
//!         "compute",
//!         |request| match request {
//!             ClientRequest::Legacy(args) => Ok::<_, ConfigError>(ComputeClient {
//!                 endpoint_type: args.keywords.text("endpoint_type").map(str::to_string),
//!                 version: args.version().map(str::to_string),
//!             }),
//!             ClientRequest::ObjectStore(_) => unreachable!(),
//!         },
//!         LegacyClientOptions::new(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use stratus_session::Session;
use url::Url;

use crate::profile::{IDENTITY, IMAGE, NETWORK, OBJECT_STORE};
use crate::{CloudProfile, ConfigError};

// ─────────────────────────────────────────────────────────────────────────────
// Request types
// ─────────────────────────────────────────────────────────────────────────────

/// One constructor argument.
#[derive(Debug, Clone)]
pub enum ClientArg {
    /// The profile's shared session.
    Session(Arc<Session>),
    /// A string that may be absent.
    Text(Option<String>),
    /// Any other value.
    Value(Value),
}

impl ClientArg {
    /// The string content, if this is a present `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClientArg::Text(text) => text.as_deref(),
            _ => None,
        }
    }

    /// The session, if this is a `Session`.
    pub fn as_session(&self) -> Option<&Arc<Session>> {
        match self {
            ClientArg::Session(session) => Some(session),
            _ => None,
        }
    }
}

impl From<&str> for ClientArg {
    fn from(value: &str) -> Self {
        ClientArg::Text(Some(value.to_string()))
    }
}

impl From<String> for ClientArg {
    fn from(value: String) -> Self {
        ClientArg::Text(Some(value))
    }
}

impl From<Option<String>> for ClientArg {
    fn from(value: Option<String>) -> Self {
        ClientArg::Text(value)
    }
}

impl From<Arc<Session>> for ClientArg {
    fn from(value: Arc<Session>) -> Self {
        ClientArg::Session(value)
    }
}

impl From<Value> for ClientArg {
    fn from(value: Value) -> Self {
        ClientArg::Value(value)
    }
}

/// Ordered keyword arguments; setting an existing name replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct KeywordArgs {
    entries: Vec<(String, ClientArg)>,
}

impl KeywordArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a keyword, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ClientArg>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ClientArg>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ClientArg> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Shorthand for `get(name)` followed by [`ClientArg::as_text`].
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ClientArg::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Apply every entry of `other` on top of this one.
    pub fn extend(&mut self, other: KeywordArgs) {
        for (name, value) in other.entries {
            self.set(name, value);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Arguments for a conventional versioned client constructor.
#[derive(Debug, Clone)]
pub struct LegacyClientArgs {
    /// Positional arguments (the API version, unless opted out).
    pub positional: Vec<ClientArg>,
    /// Keyword arguments.
    pub keywords: KeywordArgs,
}

impl LegacyClientArgs {
    /// The positional API version, if one was passed and is known.
    pub fn version(&self) -> Option<&str> {
        self.positional.first().and_then(ClientArg::as_text)
    }
}

/// Nested options for an object-store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreOptions {
    pub auth_token: String,
    pub object_storage_url: String,
    pub region_name: String,
}

/// Arguments for an object-store client, which authenticates with a
/// pre-issued token against a pre-resolved URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreArgs {
    pub preauth_url: String,
    pub preauth_token: String,
    /// Identity API version.
    pub auth_version: Option<String>,
    pub options: ObjectStoreOptions,
    pub timeout: Option<Duration>,
}

/// What a client constructor is asked to build.
#[derive(Debug, Clone)]
pub enum ClientRequest {
    Legacy(LegacyClientArgs),
    ObjectStore(ObjectStoreArgs),
}

/// Caller knobs for [`CloudProfile::legacy_client`].
#[derive(Debug, Clone)]
pub struct LegacyClientOptions {
    /// Keyword used to pass the interface; defaults per service.
    pub interface_key: Option<String>,
    /// Whether to pass the API version positionally.
    pub pass_version_arg: bool,
    /// Extra keywords; these win over computed ones.
    pub overrides: KeywordArgs,
}

impl Default for LegacyClientOptions {
    fn default() -> Self {
        Self {
            interface_key: None,
            pass_version_arg: true,
            overrides: KeywordArgs::new(),
        }
    }
}

impl LegacyClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interface_key(mut self, key: impl Into<String>) -> Self {
        self.interface_key = Some(key.into());
        self
    }

    pub fn pass_version_arg(mut self, pass: bool) -> Self {
        self.pass_version_arg = pass;
        self
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<ClientArg>) -> Self {
        self.overrides.set(name, value);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bridges
// ─────────────────────────────────────────────────────────────────────────────

impl CloudProfile {
    /// Build an external client for a service.
    ///
    /// The constructor's result is returned untouched. `Ok(None)` only
    /// happens for `object-store` when the catalog does not offer it.
    pub async fn legacy_client<C, E, F>(
        &self,
        service_key: &str,
        constructor: F,
        options: LegacyClientOptions,
    ) -> Result<Option<C>, E>
    where
        F: FnOnce(ClientRequest) -> Result<C, E>,
        E: From<ConfigError>,
    {
        if service_key == OBJECT_STORE {
            return self.object_store_client(constructor).await;
        }

        let interface = self.interface(Some(service_key));
        let endpoint = self.session_endpoint(service_key).await?;

        let interface_key = options.interface_key.unwrap_or_else(|| {
            if service_key == IMAGE {
                "interface".to_string()
            } else {
                "endpoint_type".to_string()
            }
        });

        let mut keywords = KeywordArgs::new();
        keywords.set("session", self.session()?);
        keywords.set("service_name", self.service_name(service_key));
        keywords.set("service_type", self.service_type(service_key));
        keywords.set("region_name", self.region.clone());

        if service_key == IMAGE {
            let endpoint = endpoint.as_deref().map(|e| strip_version(e).0);
            keywords.set("endpoint", endpoint);
        }
        keywords.extend(options.overrides);
        keywords.set(interface_key, interface);

        let mut positional = Vec::new();
        if options.pass_version_arg {
            let mut version = self.api_version(service_key);
            if service_key == NETWORK && version.as_deref() == Some("2") {
                version = Some("2.0".to_string());
            }
            if service_key == IDENTITY && !keywords.contains("endpoint") {
                let endpoint = self.session_endpoint(IDENTITY).await?;
                keywords.set("endpoint", endpoint);
            }
            positional.push(ClientArg::Text(version));
        }

        tracing::debug!(
            cloud = %self.name,
            service = service_key,
            keywords = ?keywords.names().collect::<Vec<_>>(),
            "Constructing service client"
        );

        constructor(ClientRequest::Legacy(LegacyClientArgs {
            positional,
            keywords,
        }))
        .map(Some)
    }

    /// Build an object-store client from the session token and catalog URL.
    async fn object_store_client<C, E, F>(&self, constructor: F) -> Result<Option<C>, E>
    where
        F: FnOnce(ClientRequest) -> Result<C, E>,
        E: From<ConfigError>,
    {
        let session = self.session()?;
        let token = session.token().await.map_err(ConfigError::from)?;
        let Some(endpoint) = self.session_endpoint(OBJECT_STORE).await? else {
            tracing::debug!(cloud = %self.name, "No object-store endpoint in catalog");
            return Ok(None);
        };

        let args = ObjectStoreArgs {
            preauth_url: endpoint.clone(),
            preauth_token: token.clone(),
            auth_version: self.api_version(IDENTITY),
            options: ObjectStoreOptions {
                auth_token: token,
                object_storage_url: endpoint,
                region_name: self.region.clone(),
            },
            timeout: self.api_timeout()?,
        };
        constructor(ClientRequest::ObjectStore(args)).map(Some)
    }
}

/// Split the API version path off an endpoint.
///
/// `https://image.example.com/v2/` becomes `("https://image.example.com",
/// Some("2"))`. When the first path segment is a version, it and everything
/// after it are dropped (`/v2/images` also yields the bare host). Other
/// endpoints come back unchanged (minus trailing slashes).
pub fn strip_version(endpoint: &str) -> (String, Option<String>) {
    let trimmed = endpoint.trim_end_matches('/');
    let Ok(url) = Url::parse(trimmed) else {
        return (trimmed.to_string(), None);
    };

    let first_segment = url.path().trim_start_matches('/').split('/').next();
    let Some(version) = first_segment
        .and_then(|segment| segment.strip_prefix('v'))
        .filter(|v| is_version_number(v))
    else {
        return (trimmed.to_string(), None);
    };

    let mut base = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }
    (base, Some(version.to_string()))
}

/// `2`, `2.0`, `10.1`.
fn is_version_number(s: &str) -> bool {
    let mut parts = s.split('.');
    let major_ok = parts
        .next()
        .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    let minor_ok = parts
        .next()
        .is_none_or(|p| p.chars().all(|c| c.is_ascii_digit()));
    major_ok && minor_ok && parts.next().is_none()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stratus_session::{CatalogEndpoint, CatalogEntry, ServiceCatalog, StaticTokenAuth};

    use super::*;

    fn test_catalog(with_object_store: bool) -> ServiceCatalog {
        let mut entries = vec![
            CatalogEntry::new("compute", Some("nova")).with_endpoint(CatalogEndpoint::new(
                "public",
                Some("RegionOne"),
                "https://nova.example.com/v2.1",
            )),
            CatalogEntry::new("image", Some("glance")).with_endpoint(CatalogEndpoint::new(
                "public",
                Some("RegionOne"),
                "https://glance.example.com/v2/",
            )),
            CatalogEntry::new("network", Some("neutron")).with_endpoint(CatalogEndpoint::new(
                "public",
                Some("RegionOne"),
                "https://neutron.example.com",
            )),
        ];
        if with_object_store {
            entries.push(
                CatalogEntry::new("object-store", Some("swift")).with_endpoint(
                    CatalogEndpoint::new(
                        "public",
                        Some("RegionOne"),
                        "https://swift.example.com/v1/AUTH_demo",
                    ),
                ),
            );
        }
        ServiceCatalog::new(entries)
    }

    fn profile(value: Value, with_object_store: bool) -> CloudProfile {
        let Value::Object(map) = value else {
            panic!("config must be an object");
        };
        let auth = StaticTokenAuth::new("tok", test_catalog(with_object_store))
            .with_auth_url("https://keystone.example.com/v3")
            .shared();
        CloudProfile::new("mycloud", "RegionOne", map).with_auth(auth)
    }

    fn legacy(request: ClientRequest) -> Result<LegacyClientArgs, ConfigError> {
        match request {
            ClientRequest::Legacy(args) => Ok(args),
            ClientRequest::ObjectStore(_) => panic!("expected legacy request"),
        }
    }

    fn object_store(request: ClientRequest) -> Result<ObjectStoreArgs, ConfigError> {
        match request {
            ClientRequest::ObjectStore(args) => Ok(args),
            ClientRequest::Legacy(_) => panic!("expected object-store request"),
        }
    }

    #[tokio::test]
    async fn test_compute_client_args() {
        let p = profile(
            json!({
                "interface": "public",
                "compute_api_version": "2.1",
                "compute_service_name": "nova"
            }),
            false,
        );
        let args = p
            .legacy_client("compute", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(args.version(), Some("2.1"));
        assert_eq!(args.keywords.text("service_name"), Some("nova"));
        assert_eq!(args.keywords.text("service_type"), Some("compute"));
        assert_eq!(args.keywords.text("region_name"), Some("RegionOne"));
        assert_eq!(args.keywords.text("endpoint_type"), Some("public"));
        assert!(!args.keywords.contains("interface"));
        assert!(!args.keywords.contains("endpoint"));

        let session = args.keywords.get("session").and_then(ClientArg::as_session).unwrap();
        assert!(Arc::ptr_eq(session, &p.session().unwrap()));

        let names: Vec<&str> = args.keywords.names().collect();
        assert_eq!(
            names,
            vec!["session", "service_name", "service_type", "region_name", "endpoint_type"]
        );
    }

    #[tokio::test]
    async fn test_network_version_rewrite() {
        let p = profile(json!({"network_api_version": "2"}), false);
        let args = p
            .legacy_client("network", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.version(), Some("2.0"));

        let p = profile(json!({"compute_api_version": "2"}), false);
        let args = p
            .legacy_client("compute", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.version(), Some("2"));
    }

    #[tokio::test]
    async fn test_version_opt_out() {
        let p = profile(json!({"network_api_version": "2"}), false);
        let args = p
            .legacy_client(
                "network",
                legacy,
                LegacyClientOptions::new().pass_version_arg(false),
            )
            .await
            .unwrap()
            .unwrap();
        assert!(args.positional.is_empty());
        assert!(args.version().is_none());
    }

    #[tokio::test]
    async fn test_absent_version_is_still_positional() {
        let p = profile(json!({}), false);
        let args = p
            .legacy_client("compute", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.positional.len(), 1);
        assert!(args.version().is_none());
    }

    #[tokio::test]
    async fn test_image_client_args() {
        let p = profile(json!({"image_interface": "internal", "interface": "public"}), false);
        let args = p
            .legacy_client("image", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();
        // Catalog only has a public image endpoint.
        assert!(args.keywords.contains("endpoint"));
        assert!(args.keywords.text("endpoint").is_none());
        assert_eq!(args.keywords.text("interface"), Some("internal"));

        let p = profile(json!({"image_api_version": "2"}), false);
        let args = p
            .legacy_client("image", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.keywords.text("endpoint"), Some("https://glance.example.com"));
        assert!(args.keywords.contains("interface"));
        assert!(!args.keywords.contains("endpoint_type"));
        assert_eq!(args.version(), Some("2"));
    }

    #[tokio::test]
    async fn test_interface_key_override() {
        let p = profile(json!({"interface": "admin", "compute_endpoint": "https://x"}), false);
        let args = p
            .legacy_client(
                "compute",
                legacy,
                LegacyClientOptions::new().interface_key("interface"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.keywords.text("interface"), Some("admin"));
        assert!(!args.keywords.contains("endpoint_type"));
    }

    #[tokio::test]
    async fn test_caller_overrides_win_except_interface() {
        let p = profile(json!({"interface": "public"}), false);
        let args = p
            .legacy_client(
                "compute",
                legacy,
                LegacyClientOptions::new()
                    .with_override("region_name", "RegionTwo")
                    .with_override("endpoint_type", "admin")
                    .with_override("insecure", json!(true)),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.keywords.text("region_name"), Some("RegionTwo"));
        assert_eq!(args.keywords.text("endpoint_type"), Some("public"));
        assert!(matches!(
            args.keywords.get("insecure"),
            Some(ClientArg::Value(Value::Bool(true)))
        ));
    }

    #[tokio::test]
    async fn test_identity_endpoint_forced() {
        let p = profile(json!({"identity_api_version": "3"}), false);
        let args = p
            .legacy_client("identity", legacy, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.version(), Some("3"));
        assert_eq!(
            args.keywords.text("endpoint"),
            Some("https://keystone.example.com/v3")
        );
    }

    #[tokio::test]
    async fn test_identity_endpoint_kept_when_given() {
        let p = profile(json!({}), false);
        let args = p
            .legacy_client(
                "identity",
                legacy,
                LegacyClientOptions::new().with_override("endpoint", "https://mine/v3"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.keywords.text("endpoint"), Some("https://mine/v3"));
    }

    #[tokio::test]
    async fn test_identity_endpoint_not_forced_without_version() {
        let p = profile(json!({}), false);
        let args = p
            .legacy_client(
                "identity",
                legacy,
                LegacyClientOptions::new().pass_version_arg(false),
            )
            .await
            .unwrap()
            .unwrap();
        assert!(!args.keywords.contains("endpoint"));
    }

    #[tokio::test]
    async fn test_missing_auth_propagates() {
        let p = CloudProfile::new("mycloud", "RegionOne", serde_json::Map::new());
        let err = p
            .legacy_client("compute", legacy, LegacyClientOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuth { .. }));
    }

    #[tokio::test]
    async fn test_constructor_error_propagates() {
        let p = profile(json!({}), false);
        let err = p
            .legacy_client(
                "compute",
                |_| -> Result<(), ConfigError> {
                    Err(ConfigError::InvalidValue {
                        key: "ctor".to_string(),
                        message: "boom".to_string(),
                    })
                },
                LegacyClientOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ctor"));
    }

    #[tokio::test]
    async fn test_object_store_client_args() {
        let p = profile(json!({"identity_api_version": "3", "api_timeout": 45}), true);
        let args = p
            .legacy_client("object-store", object_store, LegacyClientOptions::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(args.preauth_url, "https://swift.example.com/v1/AUTH_demo");
        assert_eq!(args.preauth_token, "tok");
        assert_eq!(args.auth_version.as_deref(), Some("3"));
        assert_eq!(
            args.options,
            ObjectStoreOptions {
                auth_token: "tok".to_string(),
                object_storage_url: "https://swift.example.com/v1/AUTH_demo".to_string(),
                region_name: "RegionOne".to_string(),
            }
        );
        assert_eq!(args.timeout, Some(Duration::from_secs(45)));
    }

    #[tokio::test]
    async fn test_object_store_absent_is_none() {
        let p = profile(json!({}), false);
        let result = p
            .legacy_client("object-store", object_store, LegacyClientOptions::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(
            strip_version("https://glance.example.com/v2/"),
            ("https://glance.example.com".to_string(), Some("2".to_string()))
        );
        assert_eq!(
            strip_version("http://glance:9292/v1.1"),
            ("http://glance:9292".to_string(), Some("1.1".to_string()))
        );
        assert_eq!(
            strip_version("https://glance.example.com"),
            ("https://glance.example.com".to_string(), None)
        );
        assert_eq!(
            strip_version("https://example.com/image/v2"),
            ("https://example.com/image/v2".to_string(), None)
        );
        assert_eq!(
            strip_version("https://glance.example.com:9292/v2/images"),
            ("https://glance.example.com:9292".to_string(), Some("2".to_string()))
        );
        assert_eq!(
            strip_version("https://example.com/version"),
            ("https://example.com/version".to_string(), None)
        );
        assert_eq!(strip_version("not a url/"), ("not a url".to_string(), None));
    }

    #[test]
    fn test_keyword_args_replace_in_place() {
        let mut kwargs = KeywordArgs::new().with("a", "1").with("b", "2");
        kwargs.set("a", "3");
        assert_eq!(kwargs.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(kwargs.text("a"), Some("3"));
        assert_eq!(kwargs.len(), 2);

        kwargs.extend(KeywordArgs::new().with("c", json!(1)).with("b", None::<String>));
        assert_eq!(kwargs.len(), 3);
        assert!(kwargs.contains("b"));
        assert!(kwargs.text("b").is_none());
    }
}
