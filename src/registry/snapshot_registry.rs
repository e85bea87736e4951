use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::snapshot::{DomainConflict, RegistrySnapshot};
use super::tenant::Tenant;
use super::{RegistryError, TenantRegistry};

struct SnapshotState {
    current: Option<Arc<RegistrySnapshot>>,
    refreshed_at: Option<Instant>,
    last_error: Option<(DateTime<Utc>, String)>,
}

/// Health summary for `/health` and the admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub loaded: bool,
    pub stale: bool,
    pub tenant_count: usize,
    pub conflict_count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl RegistryStatus {
    pub fn is_available(&self) -> bool {
        self.loaded && !self.stale
    }
}

/// In-memory registry serving lookups from the latest [`RegistrySnapshot`].
///
/// Writers build a new snapshot off to the side and swap the `Arc`; readers
/// only hold the lock long enough to clone it. The lock is a plain
/// `std::sync::RwLock` that is never held across an `.await`, so a lookup
/// waits at most for a pointer swap, never for a refresh. Until the first successful
/// load, or once the snapshot is older than `max_staleness`, lookups fail with
/// a [`RegistryError`] rather than reporting every host as unknown.
pub struct SnapshotRegistry {
    state: RwLock<SnapshotState>,
    max_staleness: Option<Duration>,
}

impl SnapshotRegistry {
    /// Empty registry waiting for its first load.
    pub fn new(max_staleness: Option<Duration>) -> Self {
        Self {
            state: RwLock::new(SnapshotState {
                current: None,
                refreshed_at: None,
                last_error: None,
            }),
            max_staleness,
        }
    }

    /// Registry pre-loaded with a fixed tenant list that never goes stale.
    pub fn from_tenants(tenants: Vec<Tenant>) -> Self {
        Self {
            state: RwLock::new(SnapshotState {
                current: Some(Arc::new(RegistrySnapshot::build(tenants))),
                refreshed_at: Some(Instant::now()),
                last_error: None,
            }),
            max_staleness: None,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SnapshotState> {
        // every write leaves the state consistent, so a poisoned lock is still usable
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SnapshotState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swaps in a freshly built snapshot.
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        let snapshot = Arc::new(snapshot);
        let mut state = self.write_state();
        state.current = Some(snapshot);
        state.refreshed_at = Some(Instant::now());
        state.last_error = None;
    }

    /// Remembers a failed refresh. The current snapshot keeps serving.
    pub fn record_failure(&self, error: &RegistryError) {
        let mut state = self.write_state();
        state.last_error = Some((Utc::now(), error.to_string()));
    }

    /// Current snapshot, or the reason it cannot be used.
    pub fn snapshot(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let state = self.read_state();
        let current = state.current.as_ref().ok_or(RegistryError::NotLoaded)?;

        if let (Some(max), Some(refreshed_at)) = (self.max_staleness, state.refreshed_at) {
            let age = refreshed_at.elapsed();
            if age > max {
                return Err(RegistryError::Stale { age_secs: age.as_secs() });
            }
        }

        Ok(Arc::clone(current))
    }

    pub fn status(&self) -> RegistryStatus {
        let state = self.read_state();
        let stale = match (self.max_staleness, state.refreshed_at) {
            (Some(max), Some(refreshed_at)) => refreshed_at.elapsed() > max,
            _ => false,
        };

        RegistryStatus {
            loaded: state.current.is_some(),
            stale,
            tenant_count: state.current.as_ref().map_or(0, |s| s.len()),
            conflict_count: state.current.as_ref().map_or(0, |s| s.conflicts().len()),
            loaded_at: state.current.as_ref().map(|s| s.loaded_at()),
            last_error: state.last_error.as_ref().map(|(_, e)| e.clone()),
            last_error_at: state.last_error.as_ref().map(|(at, _)| *at),
        }
    }

    pub fn conflicts(&self) -> Result<Vec<DomainConflict>, RegistryError> {
        Ok(self.snapshot()?.conflicts().to_vec())
    }
}

#[async_trait]
impl TenantRegistry for SnapshotRegistry {
    async fn lookup_by_domain(&self, domain: &str) -> Result<Option<Arc<Tenant>>, RegistryError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.get(domain).cloned())
    }
}
