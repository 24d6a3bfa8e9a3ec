//! Session acquisition and endpoint resolution.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use stratus_session::{EndpointFilter, Session};

use crate::profile::IDENTITY;
use crate::{CloudProfile, ConfigError, Result};

impl CloudProfile {
    /// Get the profile's session, building it on first use.
    ///
    /// The session is built at most once per profile, even under concurrent
    /// callers. A failed build leaves nothing behind, so the next call tries
    /// again.
    pub fn session(&self) -> Result<Arc<Session>> {
        let mut slot = self.session.lock();
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }

        let auth = self.auth.clone().ok_or_else(|| ConfigError::MissingAuth {
            cloud: self.name.clone(),
        })?;

        let (verify, cert) = self.verify_args();
        if !verify.is_enabled() {
            tracing::debug!(
                cloud = %self.name,
                region = %self.region,
                "Turning off SSL warnings since verify=false"
            );
        }

        let session = Arc::new(
            Session::builder()
                .auth(auth)
                .verify(verify)
                .cert(cert)
                .timeout(self.api_timeout()?)
                .build()?,
        );
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The `api_timeout` setting, in seconds.
    pub fn api_timeout(&self) -> Result<Option<Duration>> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "api_timeout".to_string(),
            message,
        };
        let seconds = match self.config.get("api_timeout") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| invalid(format!("{} is not representable", n)))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(format!("'{}': {}", s, e)))?,
            Some(other) => return Err(invalid(format!("expected seconds, got {}", other))),
        };
        Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(|e| invalid(format!("{}: {}", seconds, e)))
    }

    /// Resolve a service endpoint from config or the session catalog.
    ///
    /// An explicit `{service}_endpoint` wins. Otherwise the session is
    /// acquired (and may fail with [`ConfigError::MissingAuth`]) and its
    /// catalog queried; the identity service resolves to the auth endpoint.
    /// `Ok(None)` means the catalog does not offer the service.
    pub async fn session_endpoint(&self, service_key: &str) -> Result<Option<String>> {
        if let Some(endpoint) = self.endpoint(service_key).filter(|e| !e.is_empty()) {
            return Ok(Some(endpoint));
        }

        let session = self.session()?;
        let filter = if service_key == IDENTITY {
            EndpointFilter::auth()
        } else {
            EndpointFilter::service(self.service_type(service_key))
                .with_name(self.service_name(service_key))
                .with_interface(self.interface(Some(service_key)))
                .with_region(Some(self.region.clone()))
        };
        Ok(session.endpoint(&filter).await?)
    }
}
