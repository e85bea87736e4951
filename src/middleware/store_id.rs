use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderName},
};

use crate::error::ApiError;
use crate::routing::DEFAULT_IDENTITY_HEADER;

use super::tenant_router::IdentityHeader;

/// Tenant id for the current request, read from the identity header set by
/// the tenant router. Handlers use this instead of looking at the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreId(pub String);

impl StoreId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn header_name(parts: &Parts) -> HeaderName {
        parts
            .extensions
            .get::<IdentityHeader>()
            .map(|h| h.0.clone())
            .unwrap_or_else(|| HeaderName::from_static(DEFAULT_IDENTITY_HEADER))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StoreId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = Self::header_name(parts);
        let value = parts
            .headers
            .get(&header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::not_found("No store is configured for this host"))?;

        Ok(StoreId(value.to_string()))
    }
}
