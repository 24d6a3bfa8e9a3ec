//! Cloud profile resolution for the Stratus platform.
//!
//! A [`CloudProfile`] wraps one named cloud's merged configuration mapping and
//! resolves, for any service it knows about:
//! - Interface, region, API version, service type/name, endpoint overrides
//!   (`{service}_{attribute}` keys falling back to cloud-wide defaults)
//! - TLS verification and client certificates
//! - A lazily built, memoized [`Session`](stratus_session::Session)
//! - Endpoints from the session catalog
//! - Constructor arguments for external service clients
//!
//! Cache policy shared across profiles lives in a [`ProfileStore`], with
//! [`CacheSettings`] as the YAML-backed implementation.

pub mod cache;
pub mod client;
pub mod error;
pub mod profile;
pub mod session;
pub mod tls;

pub use cache::{CacheSettings, ProfileStore, SharedProfileStore};
pub use client::{
    ClientArg, ClientRequest, KeywordArgs, LegacyClientArgs, LegacyClientOptions,
    ObjectStoreArgs, ObjectStoreOptions, strip_version,
};
pub use error::{ConfigError, Result};
pub use profile::{CloudProfile, normalize_key};
