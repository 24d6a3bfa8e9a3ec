//! TLS arguments handed to a [`Session`](crate::Session).

use std::path::{Path, PathBuf};

/// Effective server-certificate verification setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyArg {
    /// Verify against the platform roots (`true`) or not at all (`false`).
    Flag(bool),
    /// Verify against a CA bundle on disk.
    CaBundle(PathBuf),
}

impl VerifyArg {
    /// Whether server certificates will be verified at all.
    pub fn is_enabled(&self) -> bool {
        match self {
            VerifyArg::Flag(enabled) => *enabled,
            VerifyArg::CaBundle(_) => true,
        }
    }

    /// The CA bundle path, if one is authoritative.
    pub fn ca_bundle(&self) -> Option<&Path> {
        match self {
            VerifyArg::CaBundle(path) => Some(path),
            VerifyArg::Flag(_) => None,
        }
    }
}

impl Default for VerifyArg {
    fn default() -> Self {
        VerifyArg::Flag(true)
    }
}

/// Client certificate presented during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCert {
    /// A single PEM file holding both certificate and private key.
    Single(PathBuf),
    /// Separate certificate and private key files.
    Pair { cert: PathBuf, key: PathBuf },
}

impl ClientCert {
    /// Files that make up the identity, certificate first.
    pub fn files(&self) -> Vec<&Path> {
        match self {
            ClientCert::Single(cert) => vec![cert.as_path()],
            ClientCert::Pair { cert, key } => vec![cert.as_path(), key.as_path()],
        }
    }
}
