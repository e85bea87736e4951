// handlers/tenants.rs - registry inspection for operators
//
// GET /api/root/tenants            - snapshot contents
// GET /api/root/tenants/conflicts  - duplicate-domain report
// GET /api/root/tenants/resolve    - dry-run a host/path through the router

use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::{DomainConflict, RegistrySnapshot, Tenant};

#[derive(Debug, Serialize)]
pub struct TenantListing {
    pub loaded_at: chrono::DateTime<chrono::Utc>,
    pub count: usize,
    pub tenants: Vec<Tenant>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub host: Option<String>,
    pub path: Option<String>,
}

fn current_snapshot(state: &AppState) -> Result<std::sync::Arc<RegistrySnapshot>, ApiError> {
    match state.registry.snapshot() {
        Some(result) => Ok(result?),
        None => Err(ApiError::bad_request(
            "Tenant listing is not available when the registry runs in direct mode",
        )),
    }
}

pub async fn tenant_list(State(state): State<AppState>) -> ApiResult<TenantListing> {
    let snapshot = current_snapshot(&state)?;

    Ok(ApiResponse::success(TenantListing {
        loaded_at: snapshot.loaded_at(),
        count: snapshot.len(),
        tenants: snapshot.tenants().iter().map(|t| (**t).clone()).collect(),
        skipped: snapshot.skipped().to_vec(),
    }))
}

pub async fn tenant_conflicts(State(state): State<AppState>) -> ApiResult<Vec<DomainConflict>> {
    let snapshot = current_snapshot(&state)?;
    Ok(ApiResponse::success(snapshot.conflicts().to_vec()))
}

pub async fn tenant_resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Value> {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    if !path.starts_with('/') {
        return Err(ApiError::bad_request("path must start with '/'"));
    }

    let decision = state
        .router
        .route(query.host.as_deref(), &path, &HeaderMap::new())
        .await?;

    Ok(ApiResponse::success(decision.summary()))
}
