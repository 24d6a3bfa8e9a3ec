//! TLS verification and client certificate materialization.

use std::path::PathBuf;

use serde_json::Value;
use stratus_session::{ClientCert, VerifyArg};

use crate::CloudProfile;

impl CloudProfile {
    /// Merge `verify`, `cacert`, `cert` and `key` into session TLS arguments.
    ///
    /// A configured CA bundle wins when verification is on. Turning
    /// verification off while a CA bundle is configured logs a warning and
    /// proceeds unverified.
    pub fn verify_args(&self) -> (VerifyArg, Option<ClientCert>) {
        let verify = self.config.get("verify").is_none_or(is_truthy);
        let cacert = self.path("cacert");

        let verify = match (verify, cacert) {
            (true, Some(cacert)) => VerifyArg::CaBundle(cacert),
            (verify, cacert) => {
                if cacert.is_some() {
                    tracing::warn!(
                        cloud = %self.name,
                        "A cacert is configured for cloud {} but host verification is disabled; \
                         the host SSL cert will not be verified",
                        self.name
                    );
                }
                VerifyArg::Flag(verify)
            }
        };

        let cert = self.path("cert").map(|cert| match self.path("key") {
            Some(key) => ClientCert::Pair { cert, key },
            None => ClientCert::Single(cert),
        });

        (verify, cert)
    }

    /// A non-empty string value as a path.
    fn path(&self, key: &str) -> Option<PathBuf> {
        self.string(key)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

/// Loose boolean reading for flags that may arrive as strings or numbers.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "0" | "no" | "off"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
