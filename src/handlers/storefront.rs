// handlers/storefront.rs - storefront pages for rewritten tenant traffic
//
// These handlers learn the store from the identity header only; they never
// look at the Host header.

use axum::{extract::Path, Extension};
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, ResolvedTenant, StoreId};
use crate::registry::TenantStatus;

#[derive(Debug, Serialize)]
pub struct StorefrontPage {
    pub store_id: String,
    pub store_name: Option<String>,
    pub status: Option<TenantStatus>,
    pub page: String,
}

fn page(store: StoreId, tenant: Option<Extension<ResolvedTenant>>, page: String) -> StorefrontPage {
    let tenant = tenant.map(|Extension(ResolvedTenant(t))| t);
    StorefrontPage {
        store_id: store.0,
        store_name: tenant.as_ref().map(|t| t.name.clone()),
        status: tenant.as_ref().map(|t| t.status),
        page,
    }
}

/// GET /store - storefront home
pub async fn store_home(store: StoreId, tenant: Option<Extension<ResolvedTenant>>) -> ApiResult<StorefrontPage> {
    Ok(ApiResponse::success(page(store, tenant, "/".to_string())))
}

/// GET /store/*rest - any page under the storefront
pub async fn store_page(
    store: StoreId,
    tenant: Option<Extension<ResolvedTenant>>,
    Path(rest): Path<String>,
) -> ApiResult<StorefrontPage> {
    Ok(ApiResponse::success(page(store, tenant, format!("/{}", rest.trim_start_matches('/')))))
}
