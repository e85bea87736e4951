use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{uri::PathAndQuery, HeaderName, Uri},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::registry::Tenant;
use crate::routing::host::request_host;
use crate::routing::{PassthroughReason, RoutingDecision, TenantRouter};

/// Tenant matched for this request, for in-process handlers that want more
/// than the identity header.
#[derive(Clone, Debug)]
pub struct ResolvedTenant(pub Arc<Tenant>);

/// Name of the header that carries the tenant id, so extractors do not need
/// global configuration.
#[derive(Clone, Debug)]
pub struct IdentityHeader(pub HeaderName);

/// Middleware state.
#[derive(Clone)]
pub struct TenantRouting {
    router: Arc<TenantRouter>,
    trust_forwarded_host: bool,
}

impl TenantRouting {
    pub fn new(router: Arc<TenantRouter>, trust_forwarded_host: bool) -> Self {
        Self {
            router,
            trust_forwarded_host,
        }
    }

    pub fn router(&self) -> &Arc<TenantRouter> {
        &self.router
    }
}

/// Resolves the tenant for the request host and applies the routing decision
/// before the application router sees the request.
///
/// Must wrap the application router (not be added with `Router::layer` on
/// it), otherwise the rewritten path would not take part in route matching.
pub async fn tenant_router_middleware(
    State(routing): State<TenantRouting>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let host = request_host(&parts.headers, &parts.uri, routing.trust_forwarded_host).map(str::to_owned);
    let path = parts.uri.path().to_owned();

    // Registry failures become a 503 here; never a passthrough
    let decision = routing.router.route(host.as_deref(), &path, &parts.headers).await?;

    parts
        .extensions
        .insert(IdentityHeader(routing.router.identity_header().clone()));

    if decision.reason != Some(PassthroughReason::Excluded) {
        apply_decision(&mut parts, decision)?;
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn apply_decision(parts: &mut axum::http::request::Parts, decision: RoutingDecision) -> Result<(), ApiError> {
    if decision.path_changed() {
        parts.uri = with_path(&parts.uri, &decision.rewritten_path)?;
    }
    parts.headers = decision.forwarded_headers;
    if let Some(tenant) = decision.tenant {
        parts.extensions.insert(ResolvedTenant(tenant));
    }
    Ok(())
}

/// Replaces the path of `uri`, keeping scheme, authority and query.
fn with_path(uri: &Uri, path: &str) -> Result<Uri, ApiError> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    let mut uri_parts = uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| ApiError::internal_server_error(format!("Invalid rewritten path: {}", e)))?,
    );

    Uri::from_parts(uri_parts).map_err(|e| ApiError::internal_server_error(format!("Invalid rewritten URI: {}", e)))
}
