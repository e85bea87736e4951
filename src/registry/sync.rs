use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::retry::CallPolicy;
use super::snapshot::RegistrySnapshot;
use super::snapshot_registry::SnapshotRegistry;
use super::{RegistryError, TenantSource};

/// Keeps a [`SnapshotRegistry`] in step with a [`TenantSource`].
///
/// Owned by the process that serves traffic; the router itself never writes
/// to the registry.
pub struct RegistrySync {
    source: Arc<dyn TenantSource>,
    registry: Arc<SnapshotRegistry>,
    policy: CallPolicy,
    interval: Duration,
}

impl RegistrySync {
    pub fn new(
        source: Arc<dyn TenantSource>,
        registry: Arc<SnapshotRegistry>,
        policy: CallPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            policy,
            interval,
        }
    }

    /// Loads the full tenant list once and swaps it in. On failure the
    /// previous snapshot stays in place and the error is recorded.
    pub async fn refresh_once(&self) -> Result<usize, RegistryError> {
        let source = Arc::clone(&self.source);
        let operation = format!("tenant refresh from {}", self.source.describe());

        let result = self
            .policy
            .run(&operation, || {
                let source = Arc::clone(&source);
                async move { source.list_tenants().await }
            })
            .await;

        match result {
            Ok(tenants) => {
                let snapshot = RegistrySnapshot::build(tenants);
                let count = snapshot.len();
                let conflicts = snapshot.conflicts().len();
                self.registry.replace(snapshot);
                tracing::debug!("Tenant registry refreshed: {} tenants, {} domain conflicts", count, conflicts);
                Ok(count)
            }
            Err(e) => {
                self.registry.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Refreshes every `interval` until the task is aborted. The first
    /// refresh runs immediately unless a snapshot is already loaded.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            if self.registry.snapshot().is_ok() {
                // consume the immediate first tick
                ticker.tick().await;
            }

            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_once().await {
                    tracing::warn!("Tenant registry refresh failed, keeping previous snapshot: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Tenant, TenantRegistry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ToggleSource {
        failing: AtomicBool,
    }

    #[async_trait]
    impl TenantSource for ToggleSource {
        fn describe(&self) -> String {
            "toggle".to_string()
        }

        async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(RegistryError::Source("unreachable".into()))
            } else {
                Ok(vec![Tenant::new("t1", "shop.example.com", "Shop")])
            }
        }
    }

    fn sync_with(source: Arc<ToggleSource>, registry: Arc<SnapshotRegistry>) -> RegistrySync {
        RegistrySync::new(
            source,
            registry,
            CallPolicy::new(Duration::from_millis(100), 1),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn refresh_loads_snapshot() {
        let source = Arc::new(ToggleSource { failing: AtomicBool::new(false) });
        let registry = Arc::new(SnapshotRegistry::new(None));
        let sync = sync_with(source, Arc::clone(&registry));

        assert_eq!(sync.refresh_once().await.unwrap(), 1);
        assert!(registry.lookup_by_domain("shop.example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let source = Arc::new(ToggleSource { failing: AtomicBool::new(false) });
        let registry = Arc::new(SnapshotRegistry::new(None));
        let sync = sync_with(Arc::clone(&source), Arc::clone(&registry));

        sync.refresh_once().await.unwrap();
        source.failing.store(true, Ordering::SeqCst);

        assert!(sync.refresh_once().await.is_err());
        assert!(registry.lookup_by_domain("shop.example.com").await.unwrap().is_some());
        assert!(registry.status().last_error.is_some());
    }

    #[tokio::test]
    async fn failed_first_load_leaves_registry_unavailable() {
        let source = Arc::new(ToggleSource { failing: AtomicBool::new(true) });
        let registry = Arc::new(SnapshotRegistry::new(None));
        let sync = sync_with(source, Arc::clone(&registry));

        assert!(sync.refresh_once().await.is_err());
        assert!(matches!(
            registry.lookup_by_domain("shop.example.com").await,
            Err(RegistryError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn spawned_task_performs_initial_load() {
        let source = Arc::new(ToggleSource { failing: AtomicBool::new(false) });
        let registry = Arc::new(SnapshotRegistry::new(None));
        let handle = sync_with(source, Arc::clone(&registry)).spawn();

        for _ in 0..50 {
            if registry.status().loaded {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(registry.status().loaded);
        handle.abort();
    }
}
