//! Service catalog lookup.
//!
//! The catalog mirrors the identity v3 token shape:
//!
//! ```json
//! [
//!   {
//!     "type": "compute",
//!     "name": "nova",
//!     "endpoints": [
//!       { "interface": "public", "region": "RegionOne", "url": "https://compute.example.com/v2.1" }
//!     ]
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Interface used when a filter does not name one.
pub const DEFAULT_INTERFACE: &str = "public";

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint filter
// ─────────────────────────────────────────────────────────────────────────────

/// Selects one endpoint from a catalog, or the auth endpoint itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    /// Catalog service type (e.g. "compute").
    pub service_type: Option<String>,
    /// Catalog service name (e.g. "nova").
    pub service_name: Option<String>,
    /// Endpoint interface (public/internal/admin).
    pub interface: Option<String>,
    /// Region the endpoint must belong to.
    pub region_name: Option<String>,
    auth_interface: bool,
}

impl EndpointFilter {
    /// Filter selecting the endpoint the auth capability authenticates against.
    pub fn auth() -> Self {
        Self {
            auth_interface: true,
            ..Default::default()
        }
    }

    /// Filter for a catalog service type.
    pub fn service(service_type: impl Into<String>) -> Self {
        Self {
            service_type: Some(service_type.into()),
            ..Default::default()
        }
    }

    /// Restrict to a service name.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.service_name = non_empty(name);
        self
    }

    /// Restrict to an interface.
    pub fn with_interface(mut self, interface: Option<String>) -> Self {
        self.interface = non_empty(interface);
        self
    }

    /// Restrict to a region.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region_name = non_empty(region);
        self
    }

    /// Whether this filter selects the auth endpoint.
    pub fn is_auth(&self) -> bool {
        self.auth_interface
    }
}

/// An empty value places no constraint.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// One endpoint of a catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    /// Endpoint interface.
    pub interface: String,
    /// Region identifier.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint URL.
    pub url: String,
}

impl CatalogEndpoint {
    pub fn new(
        interface: impl Into<String>,
        region: Option<&str>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            region: region.map(str::to_string),
            url: url.into(),
        }
    }
}

/// One service in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Service name.
    #[serde(default)]
    pub name: Option<String>,
    /// Published endpoints.
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

impl CatalogEntry {
    pub fn new(service_type: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            service_type: service_type.into(),
            name: name.map(str::to_string),
            endpoints: Vec::new(),
        }
    }

    /// Add an endpoint.
    pub fn with_endpoint(mut self, endpoint: CatalogEndpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }
}

/// Registry of service endpoints attached to an authenticated token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Parse from the identity v3 JSON catalog.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Auth(format!("invalid catalog: {}", e)))
    }

    /// All catalog entries.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Find the URL matching a filter.
    ///
    /// The first service whose type (and name, when given) matches wins;
    /// within it, the first endpoint on the requested interface and region.
    /// Entries that publish no name are not held to the name filter.
    /// Auth filters never match a catalog entry.
    pub fn url_for(&self, filter: &EndpointFilter) -> Option<String> {
        if filter.is_auth() {
            return None;
        }
        let interface =
            normalize_interface(filter.interface.as_deref().unwrap_or(DEFAULT_INTERFACE));

        self.entries
            .iter()
            .filter(|entry| {
                filter
                    .service_type
                    .as_deref()
                    .is_none_or(|t| entry.service_type == t)
            })
            .filter(|entry| {
                filter
                    .service_name
                    .as_deref()
                    .is_none_or(|n| entry.name.as_deref().is_none_or(|name| name == n))
            })
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| {
                normalize_interface(&endpoint.interface) == interface
                    && filter
                        .region_name
                        .as_deref()
                        .is_none_or(|r| endpoint.region.as_deref() == Some(r))
            })
            .map(|endpoint| endpoint.url.clone())
    }
}

/// Accept both `public` and the legacy `publicURL` spelling.
fn normalize_interface(interface: &str) -> &str {
    interface.strip_suffix("URL").unwrap_or(interface)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
