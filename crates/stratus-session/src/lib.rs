//! Authenticated transport sessions for Stratus cloud profiles.
//!
//! A [`Session`] is the single HTTP transport a cloud profile hands to its
//! service clients. It carries:
//! - TLS settings materialized from the profile ([`VerifyArg`], [`ClientCert`])
//! - The request timeout (`api_timeout`)
//! - An [`AuthCapability`] that produces tokens and the service catalog
//!
//! Endpoint discovery goes through the [`ServiceCatalog`] returned by the
//! auth capability, filtered with an [`EndpointFilter`].

pub mod auth;
pub mod catalog;
pub mod error;
pub mod session;
pub mod tls;

pub use auth::{AccessInfo, AuthCapability, SharedAuth, StaticTokenAuth};
pub use catalog::{CatalogEndpoint, CatalogEntry, EndpointFilter, ServiceCatalog};
pub use error::{Error, Result};
pub use session::{AUTH_TOKEN_HEADER, Session, SessionBuilder};
pub use tls::{ClientCert, VerifyArg};
