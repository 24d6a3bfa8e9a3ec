//! Auth capabilities.
//!
//! An [`AuthCapability`] is built outside this crate (password, application
//! credential, token plugins...). A session only needs it to hand back a
//! token with its service catalog and to name the URL it authenticates
//! against.

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::ServiceCatalog;
use crate::{Error, Result};

// ============================================================================
// AuthCapability Trait
// ============================================================================

/// A token together with the catalog it was issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessInfo {
    /// Bearer token for `X-Auth-Token`.
    pub token: String,
    /// Service catalog attached to the token.
    pub catalog: ServiceCatalog,
}

/// Authenticates HTTP sessions and hands out tokens.
#[async_trait]
pub trait AuthCapability: Send + Sync + std::fmt::Debug {
    /// Get a valid token and catalog, authenticating if necessary.
    ///
    /// `http` is the session's configured client, so any request the
    /// capability makes honours the session's TLS settings and timeout.
    async fn access(&self, http: &reqwest::Client) -> Result<AccessInfo>;

    /// The identity endpoint this capability authenticates against.
    fn auth_url(&self) -> Option<String>;
}

/// Shared auth capability for use across profiles and sessions.
pub type SharedAuth = Arc<dyn AuthCapability>;

// ============================================================================
// StaticTokenAuth
// ============================================================================

/// A pre-issued token with a fixed catalog.
///
/// Covers admin-token style setups where the token is obtained out of band.
#[derive(Debug, Clone)]
pub struct StaticTokenAuth {
    token: String,
    catalog: ServiceCatalog,
    auth_url: Option<String>,
}

impl StaticTokenAuth {
    pub fn new(token: impl Into<String>, catalog: ServiceCatalog) -> Self {
        Self {
            token: token.into(),
            catalog,
            auth_url: None,
        }
    }

    /// Set the identity endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    /// Wrap in an `Arc` for binding to a profile.
    pub fn shared(self) -> SharedAuth {
        Arc::new(self)
    }
}

#[async_trait]
impl AuthCapability for StaticTokenAuth {
    async fn access(&self, _http: &reqwest::Client) -> Result<AccessInfo> {
        if self.token.is_empty() {
            return Err(Error::Auth("static token is empty".to_string()));
        }
        Ok(AccessInfo {
            token: self.token.clone(),
            catalog: self.catalog.clone(),
        })
    }

    fn auth_url(&self) -> Option<String> {
        self.auth_url.clone()
    }
}
