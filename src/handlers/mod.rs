// handlers/mod.rs - default route table behind the tenant router
//
// Platform pages answer passthrough traffic, storefront pages answer
// rewritten tenant traffic, and /api/root/* exposes the registry to operators.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::StoreId;

pub mod storefront; // GET /store, /store/*rest
pub mod tenants; // GET /api/root/tenants[/conflicts|/resolve]

/// GET / on a non-tenant host (tenant roots are rewritten to the storefront)
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Tenant Router",
            "version": version,
            "description": "Host-based storefront routing for a multi-tenant commerce platform",
            "endpoints": {
                "home": "/ (platform)",
                "health": "/health",
                "storefront": "/store[/*] (tenant domains)",
                "root": "/api/root/tenants (operators)",
            }
        }
    }))
}

/// GET /health - 503 while the tenant registry cannot answer lookups
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let (available, registry) = state.registry.health().await;

    if available {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "registry": registry
                }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "tenant registry unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "registry": registry
                }
            })),
        )
    }
}

/// Anything unrouted. Tenant paths keep their original namespace, so an
/// unknown path on a store domain lands here too.
pub async fn not_found(uri: Uri, store: Option<StoreId>) -> ApiError {
    match store {
        Some(store) => ApiError::not_found(format!("No page at {} for store {}", uri.path(), store.as_str())),
        None => ApiError::not_found(format!("No route for {}", uri.path())),
    }
}
