//! Host-based tenant resolution.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::registry::{RegistryError, TenantRegistry};

use super::decision::{PassthroughReason, RoutingDecision};
use super::exclusion::ExclusionList;
use super::host::normalize_host;
use super::rewrite::{RewritePolicy, StorefrontRootRewrite};

pub const DEFAULT_IDENTITY_HEADER: &str = "x-store-id";

/// Maps a request host to a tenant and decides how to forward the request.
///
/// Evaluation order:
/// 1. excluded paths pass through untouched, without a registry lookup
/// 2. any inbound identity header is dropped
/// 3. the host is normalized; an empty or unparsable host passes through
/// 4. a registry hit sets the identity header and applies the rewrite policy,
///    a miss passes through
///
/// Registry failures are returned as errors and must not be turned into a
/// passthrough by callers.
pub struct TenantRouter {
    registry: Arc<dyn TenantRegistry>,
    exclusions: ExclusionList,
    policy: Arc<dyn RewritePolicy>,
    identity_header: HeaderName,
}

impl TenantRouter {
    pub fn new(registry: Arc<dyn TenantRegistry>) -> Self {
        Self {
            registry,
            exclusions: ExclusionList::default(),
            policy: Arc::new(StorefrontRootRewrite::default()),
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionList) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn RewritePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_identity_header(mut self, header: HeaderName) -> Self {
        self.identity_header = header;
        self
    }

    pub fn identity_header(&self) -> &HeaderName {
        &self.identity_header
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    pub async fn route(
        &self,
        host: Option<&str>,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<RoutingDecision, RegistryError> {
        if let Some(rule) = self.exclusions.matching_rule(path) {
            tracing::trace!("Path '{}' excluded by '{}'", path, rule);
            return Ok(RoutingDecision::passthrough(PassthroughReason::Excluded, path, headers.clone()));
        }

        let mut forwarded = headers.clone();
        if forwarded.remove(&self.identity_header).is_some() {
            tracing::warn!("Dropped client-supplied {} header", self.identity_header);
        }

        let Some(domain) = host.and_then(normalize_host) else {
            tracing::debug!("No usable host for '{}', passing through", path);
            return Ok(RoutingDecision::passthrough(PassthroughReason::MissingHost, path, forwarded));
        };

        let tenant = match self.registry.lookup_by_domain(&domain).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => {
                tracing::debug!("Host '{}' is not a tenant domain", domain);
                return Ok(RoutingDecision::passthrough(PassthroughReason::NoMatch, path, forwarded));
            }
            Err(e) => {
                tracing::debug!("Tenant registry unavailable while routing '{}': {}", domain, e);
                return Err(e);
            }
        };

        let value = HeaderValue::from_str(&tenant.id).map_err(|_| {
            RegistryError::Source(format!("Tenant id '{}' is not a valid header value", tenant.id))
        })?;
        forwarded.insert(self.identity_header.clone(), value);

        let rewritten = self.policy.rewrite(path, &tenant);
        tracing::debug!(
            tenant_id = %tenant.id,
            host = %domain,
            "Routing '{}' -> '{}'",
            path,
            rewritten
        );

        Ok(RoutingDecision::rewrite(tenant, path, rewritten, forwarded))
    }
}
