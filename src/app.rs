//! Service assembly: registry wiring from configuration and the axum app.

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, routing::get, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, RegistryMode, RegistrySourceKind, ServerConfig};
use crate::handlers;
use crate::middleware::{tenant_router_middleware, TenantRouting};
use crate::registry::{
    postgres::lazy_pool, FileTenantSource, PgTenantRegistry, PgTenantSource, RegistryError, RegistrySnapshot,
    RegistrySync, SnapshotRegistry, TenantRegistry, TenantSource,
};
use crate::routing::{StorefrontRootRewrite, TenantRouter};

/// The registry behind the router, kept concrete for health and admin views.
#[derive(Clone)]
pub enum RegistryHandle {
    Snapshot(Arc<SnapshotRegistry>),
    Direct(Arc<PgTenantRegistry>),
}

impl RegistryHandle {
    pub fn as_registry(&self) -> Arc<dyn TenantRegistry> {
        match self {
            RegistryHandle::Snapshot(r) => r.clone() as Arc<dyn TenantRegistry>,
            RegistryHandle::Direct(r) => r.clone() as Arc<dyn TenantRegistry>,
        }
    }

    /// `(available, details)` for the health endpoint.
    pub async fn health(&self) -> (bool, Value) {
        match self {
            RegistryHandle::Snapshot(registry) => {
                let status = registry.status();
                let available = status.is_available();
                (available, json!({ "mode": "snapshot", "status": status }))
            }
            RegistryHandle::Direct(registry) => match registry.health_check().await {
                Ok(()) => (true, json!({ "mode": "direct", "database": "ok" })),
                Err(e) => (false, json!({ "mode": "direct", "database_error": e.to_string() })),
            },
        }
    }

    /// Current snapshot for listing endpoints; `None` in direct mode.
    pub fn snapshot(&self) -> Option<Result<Arc<RegistrySnapshot>, RegistryError>> {
        match self {
            RegistryHandle::Snapshot(registry) => Some(registry.snapshot()),
            RegistryHandle::Direct(_) => None,
        }
    }
}

/// Shared state for the default route table.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<TenantRouter>,
    pub registry: RegistryHandle,
    pub enable_admin_api: bool,
}

/// Everything `main` needs to serve.
pub struct Service {
    pub state: AppState,
    pub routing: TenantRouting,
    pub sync_task: Option<JoinHandle<()>>,
}

/// Builds the router and its registry from configuration.
///
/// In snapshot mode the first load is attempted before returning; if it
/// fails the service still starts and answers 503 until a refresh succeeds.
pub async fn build_service(config: &AppConfig) -> anyhow::Result<Service> {
    config.validate().context("invalid configuration")?;

    let policy = config.registry.call_policy();

    let (registry, sync_task) = match config.registry.mode {
        RegistryMode::Direct => {
            let pool = lazy_pool(
                config.registry.database_url()?,
                config.registry.max_connections,
                policy.timeout,
            )?;
            tracing::info!(
                "Direct tenant lookups against {} ({})",
                config.registry.table,
                config.registry.redacted_database_url().unwrap_or_default()
            );
            let registry = PgTenantRegistry::new(pool, &config.registry.table, policy)?;
            tracing::debug!("Direct lookups expect index: {}", registry.index_statement());
            match registry.audit().await {
                Ok(0) => {}
                Ok(n) => tracing::warn!("{} tenant domain(s) cannot be matched by direct lookups", n),
                Err(e) => tracing::warn!("Tenant domain audit skipped: {}", e),
            }
            (RegistryHandle::Direct(Arc::new(registry)), None)
        }
        RegistryMode::Snapshot => {
            let source: Arc<dyn TenantSource> = match config.registry.source {
                RegistrySourceKind::File => Arc::new(FileTenantSource::new(&config.registry.file_path)),
                RegistrySourceKind::Postgres => {
                    let pool = lazy_pool(
                        config.registry.database_url()?,
                        config.registry.max_connections,
                        policy.timeout,
                    )?;
                    Arc::new(PgTenantSource::new(pool, &config.registry.table)?)
                }
            };

            let registry = Arc::new(SnapshotRegistry::new(config.registry.max_staleness()));
            let sync = RegistrySync::new(
                Arc::clone(&source),
                Arc::clone(&registry),
                policy,
                config.registry.refresh_interval(),
            );

            match sync.refresh_once().await {
                Ok(count) => tracing::info!("Loaded {} tenants from {}", count, source.describe()),
                Err(e) => tracing::error!("Initial tenant load from {} failed: {}", source.describe(), e),
            }

            (RegistryHandle::Snapshot(registry), Some(sync.spawn()))
        }
    };

    let router = TenantRouter::new(registry.as_registry())
        .with_exclusions(config.router.exclusion_list())
        .with_policy(Arc::new(StorefrontRootRewrite::new(config.router.storefront_path.clone())))
        .with_identity_header(config.router.identity_header_name()?);
    let router = Arc::new(router);

    Ok(Service {
        state: AppState {
            router: Arc::clone(&router),
            registry,
            enable_admin_api: config.server.enable_admin_api,
        },
        routing: TenantRouting::new(router, config.router.trust_forwarded_host),
        sync_task,
    })
}

/// Default route table: platform pages, storefront and admin inspection.
pub fn routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/store", get(handlers::storefront::store_home))
        .route("/store/*rest", get(handlers::storefront::store_page));

    if state.enable_admin_api {
        router = router
            .route("/api/root/tenants", get(handlers::tenants::tenant_list))
            .route("/api/root/tenants/conflicts", get(handlers::tenants::tenant_conflicts))
            .route("/api/root/tenants/resolve", get(handlers::tenants::tenant_resolve));
    }

    router.fallback(handlers::not_found).with_state(state)
}

/// Full application: the tenant router wraps the route table so that a
/// rewritten path is what gets matched. `/health` answers ahead of tenant
/// routing so it can report a degraded registry.
pub fn app(state: AppState, routing: TenantRouting, server: &ServerConfig) -> Router {
    let tenant_routed = Router::new()
        .fallback_service(routes(state.clone()))
        .layer(middleware::from_fn_with_state(routing, tenant_router_middleware));

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
        .fallback_service(tenant_routed);

    if server.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    if server.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}
