mod common;

use std::sync::Arc;

use common::*;
use reqwest::StatusCode;
use tenant_router::app::{app, AppState, RegistryHandle};
use tenant_router::middleware::TenantRouting;
use tenant_router::registry::{SnapshotRegistry, Tenant};
use tenant_router::routing::TenantRouter;

#[tokio::test]
async fn lists_tenants_sorted_by_id() {
    let (status, body) = get(test_app(tenants()), "platform.test", "/api/root/tenants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["tenants"][0]["id"], "t1");
    assert_eq!(body["data"]["tenants"][2]["id"], "t3");
}

#[tokio::test]
async fn reports_skipped_entries() {
    let tenants = vec![
        Tenant::new("t1", "shop.example.com", "Shop"),
        Tenant::new("t9", "   ", "Blank"),
    ];
    let (status, body) = get(test_app(tenants), "platform.test", "/api/root/tenants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["skipped"][0], "t9");
}

#[tokio::test]
async fn resolve_dry_runs_a_tenant_host() {
    let (status, body) = get(
        test_app(tenants()),
        "platform.test",
        "/api/root/tenants/resolve?host=Shop.Example.com:443&path=/",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "rewrite");
    assert_eq!(body["data"]["matched_tenant_id"], "t1");
    assert_eq!(body["data"]["rewritten_path"], "/store");
    assert_eq!(body["data"]["forwarded_headers"]["x-store-id"], "t1");
}

#[tokio::test]
async fn resolve_reports_passthrough_reason() {
    let (_, body) = get(
        test_app(tenants()),
        "platform.test",
        "/api/root/tenants/resolve?host=unknown.test&path=/cart",
    )
    .await;
    assert_eq!(body["data"]["action"], "passthrough");
    assert_eq!(body["data"]["reason"], "no_match");
    assert_eq!(body["data"]["rewritten_path"], "/cart");

    let (_, body) = get(test_app(tenants()), "platform.test", "/api/root/tenants/resolve?path=/").await;
    assert_eq!(body["data"]["reason"], "missing_host");
}

#[tokio::test]
async fn resolve_rejects_relative_paths() {
    let (status, body) = get(
        test_app(tenants()),
        "platform.test",
        "/api/root/tenants/resolve?host=shop.example.com&path=cart",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn admin_routes_are_absent_when_disabled() {
    let registry = Arc::new(SnapshotRegistry::from_tenants(tenants()));
    let router = Arc::new(TenantRouter::new(registry.clone()));
    let state = AppState {
        router: Arc::clone(&router),
        registry: RegistryHandle::Snapshot(registry),
        enable_admin_api: false,
    };
    let app = app(state, TenantRouting::new(router, false), &server_config());

    let (status, body) = get(app, "platform.test", "/api/root/tenants").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No route for /api/root/tenants");
}
