//! Authenticated transport session.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Certificate, Identity, Method, RequestBuilder};

use crate::auth::SharedAuth;
use crate::catalog::EndpointFilter;
use crate::tls::{ClientCert, VerifyArg};
use crate::{Error, Result};

/// Header carrying the session token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// An HTTP transport bound to an auth capability.
///
/// Built once per cloud profile and shared by every client created from it.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use stratus_session::{ServiceCatalog, Session, StaticTokenAuth, VerifyArg};
///
/// # async fn example() -> stratus_session::Result<()> {
/// let session = Session::builder()
///     .auth(StaticTokenAuth::new("token", ServiceCatalog::default()).shared())
///     .verify(VerifyArg::Flag(true))
///     .timeout(Some(Duration::from_secs(30)))
///     .build()?;
///
/// let response = session
///     .request(reqwest::Method::GET, "https://compute.example.com/v2.1/servers")
///     .await?
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    http: reqwest::Client,
    auth: SharedAuth,
    verify: VerifyArg,
    cert: Option<ClientCert>,
    timeout: Option<Duration>,
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The configured HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The bound auth capability.
    pub fn auth(&self) -> &SharedAuth {
        &self.auth
    }

    /// Verification setting the client was built with.
    pub fn verify(&self) -> &VerifyArg {
        &self.verify
    }

    /// Client certificate the client was built with.
    pub fn cert(&self) -> Option<&ClientCert> {
        self.cert.as_ref()
    }

    /// Request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Look up an endpoint.
    ///
    /// The auth filter resolves to the capability's own URL without touching
    /// the catalog. Returns `Ok(None)` when the catalog has no match.
    pub async fn endpoint(&self, filter: &EndpointFilter) -> Result<Option<String>> {
        if filter.is_auth() {
            return Ok(self.auth.auth_url());
        }
        let access = self.auth.access(&self.http).await?;
        let url = access.catalog.url_for(filter);
        if url.is_none() {
            tracing::debug!(
                service_type = ?filter.service_type,
                service_name = ?filter.service_name,
                interface = ?filter.interface,
                region = ?filter.region_name,
                "No catalog endpoint matched"
            );
        }
        Ok(url)
    }

    /// Get the current bearer token.
    pub async fn token(&self) -> Result<String> {
        Ok(self.auth.access(&self.http).await?.token)
    }

    /// Start an authenticated request.
    pub async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.token().await?;
        let token = HeaderValue::from_str(&token)
            .map_err(|_| Error::Auth("token is not a valid header value".to_string()))?;
        Ok(self
            .http
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, token))
    }
}

/// Builder for creating a [`Session`].
#[derive(Debug, Default)]
pub struct SessionBuilder {
    auth: Option<SharedAuth>,
    verify: VerifyArg,
    cert: Option<ClientCert>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl SessionBuilder {
    /// Create a new builder with defaults (verification on, no timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auth capability.
    pub fn auth(mut self, auth: SharedAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set server certificate verification.
    pub fn verify(mut self, verify: VerifyArg) -> Self {
        self.verify = verify;
        self
    }

    /// Set the client certificate.
    pub fn cert(mut self, cert: Option<ClientCert>) -> Self {
        self.cert = cert;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the session.
    pub fn build(self) -> Result<Session> {
        let auth = self
            .auth
            .ok_or_else(|| Error::Config("auth capability is required".to_string()))?;

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("stratus-session/{}", env!("CARGO_PKG_VERSION")));
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|_| Error::Config("invalid user agent".to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(USER_AGENT, user_agent);

        let mut builder = reqwest::Client::builder().default_headers(headers);

        match &self.verify {
            VerifyArg::Flag(false) => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            VerifyArg::CaBundle(path) => {
                let pem = read_file(path)?;
                let ca = Certificate::from_pem(&pem).map_err(|e| Error::Tls {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                builder = builder.add_root_certificate(ca);
            }
            VerifyArg::Flag(true) => {}
        }

        if let Some(cert) = &self.cert {
            builder = builder.identity(load_identity(cert)?);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Session {
            http: builder.build()?,
            auth,
            verify: self.verify,
            cert: self.cert,
            timeout: self.timeout,
        })
    }
}

/// Concatenate certificate and key PEM files into one identity.
fn load_identity(cert: &ClientCert) -> Result<Identity> {
    let mut pem = Vec::new();
    for file in cert.files() {
        pem.extend(read_file(file)?);
        pem.push(b'\n');
    }
    Identity::from_pem(&pem).map_err(|e| Error::Tls {
        path: cert.files()[0].display().to_string(),
        message: e.to_string(),
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::ReadFile {
        path: path.display().to_string(),
        source: e,
    })
}
