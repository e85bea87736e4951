//! Tenant routing: exclusion check, host matching and path rewriting.

pub mod decision;
pub mod exclusion;
pub mod host;
pub mod rewrite;
pub mod router;

pub use decision::{PassthroughReason, RouteAction, RoutingDecision};
pub use exclusion::{ExclusionList, DEFAULT_EXCLUDED_PREFIXES};
pub use rewrite::{RewritePolicy, StorefrontRootRewrite, DEFAULT_STOREFRONT_PATH};
pub use router::{TenantRouter, DEFAULT_IDENTITY_HEADER};
