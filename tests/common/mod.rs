#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use reqwest::StatusCode;
use serde_json::Value;
use tower::ServiceExt;

use tenant_router::app::{app, AppState, RegistryHandle};
use tenant_router::config::ServerConfig;
use tenant_router::middleware::TenantRouting;
use tenant_router::registry::{RegistryError, SnapshotRegistry, Tenant, TenantRegistry};
use tenant_router::routing::TenantRouter;

pub fn tenants() -> Vec<Tenant> {
    vec![
        Tenant::new("t1", "shop.example.com", "Example Shop"),
        Tenant::new("t2", "boutique.example.org", "Boutique"),
        Tenant::new("t3", "xn--caf-dma.example", "Café"),
    ]
}

pub fn server_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        enable_cors: false,
        enable_request_logging: false,
        enable_admin_api: true,
    }
}

/// Full application over a fixed tenant list.
pub fn test_app(tenants: Vec<Tenant>) -> Router {
    app_with_registry(Arc::new(SnapshotRegistry::from_tenants(tenants)))
}

pub fn app_with_registry(registry: Arc<SnapshotRegistry>) -> Router {
    let router = Arc::new(TenantRouter::new(registry.clone()));
    let state = AppState {
        router: Arc::clone(&router),
        registry: RegistryHandle::Snapshot(registry),
        enable_admin_api: true,
    };
    app(state, TenantRouting::new(router, false), &server_config())
}

/// Router wired to a registry that always fails; the admin views still see
/// the fixed tenant list.
pub fn unavailable_app() -> Router {
    let registry = Arc::new(SnapshotRegistry::from_tenants(tenants()));
    let router = Arc::new(TenantRouter::new(Arc::new(DownRegistry)));
    let state = AppState {
        router: Arc::clone(&router),
        registry: RegistryHandle::Snapshot(registry),
        enable_admin_api: true,
    };
    app(state, TenantRouting::new(router, false), &server_config())
}

pub struct DownRegistry;

#[async_trait]
impl TenantRegistry for DownRegistry {
    async fn lookup_by_domain(&self, _domain: &str) -> Result<Option<Arc<Tenant>>, RegistryError> {
        Err(RegistryError::Timeout(Duration::from_millis(250)))
    }
}

/// Sends one request through the app; returns status and JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get(app: Router, host: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .header("host", host)
        .body(Body::empty())
        .expect("valid request");
    send(app, request).await
}

/// Live server on a free port, for tests that go over real TCP.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(app: Router) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        let server = Self { port, base_url, task };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
