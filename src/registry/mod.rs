//! Tenant registry: where the router learns which store owns a domain.
//!
//! The router only ever reads through [`TenantRegistry`]. Two implementations
//! ship with the crate:
//!
//! - [`SnapshotRegistry`], an in-memory copy-on-write snapshot kept fresh by
//!   [`RegistrySync`] from any [`TenantSource`] (YAML/JSON file or Postgres)
//! - [`PgTenantRegistry`], a direct per-request Postgres lookup
//!
//! Both surface infrastructure trouble as [`RegistryError`] instead of
//! pretending the domain is unknown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod postgres;
pub mod retry;
pub mod snapshot;
pub mod snapshot_registry;
pub mod sync;
pub mod tenant;

pub use file::FileTenantSource;
pub use postgres::{PgTenantRegistry, PgTenantSource};
pub use retry::CallPolicy;
pub use snapshot::{DomainConflict, RegistrySnapshot};
pub use snapshot_registry::{RegistryStatus, SnapshotRegistry};
pub use sync::RegistrySync;
pub use tenant::{Tenant, TenantStatus};

/// Registry failures. Every variant means "cannot tell who owns this host";
/// a lookup miss is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tenant registry has not been loaded yet")]
    NotLoaded,

    #[error("Tenant registry is stale: last successful refresh {age_secs}s ago")]
    Stale { age_secs: u64 },

    #[error("Tenant registry call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to read tenant file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tenant file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Tenant source error: {0}")]
    Source(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Read-only domain lookup used on every routed request.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Finds the tenant owning `domain`. `domain` must already be normalized
    /// with [`crate::routing::host::normalize_host`].
    async fn lookup_by_domain(&self, domain: &str) -> Result<Option<Arc<Tenant>>, RegistryError>;
}

/// Full tenant listing published by the store-management subsystem.
#[async_trait]
pub trait TenantSource: Send + Sync {
    /// Short human-readable description for logs.
    fn describe(&self) -> String;

    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError>;
}

