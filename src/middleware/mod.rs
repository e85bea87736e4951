pub mod response;
pub mod store_id;
pub mod tenant_router;

pub use response::{ApiResponse, ApiResult};
pub use store_id::StoreId;
pub use tenant_router::{tenant_router_middleware, IdentityHeader, ResolvedTenant, TenantRouting};
