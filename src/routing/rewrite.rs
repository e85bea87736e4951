use crate::registry::Tenant;

pub const DEFAULT_STOREFRONT_PATH: &str = "/store";

/// Decides which internal path serves a matched tenant's request.
///
/// The router decides *whether* a request belongs to a tenant; the policy
/// only decides *where* it goes.
pub trait RewritePolicy: Send + Sync {
    fn rewrite(&self, original_path: &str, tenant: &Tenant) -> String;
}

/// Maps the tenant domain root onto the platform storefront route and leaves
/// every other path alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontRootRewrite {
    storefront_path: String,
}

impl StorefrontRootRewrite {
    pub fn new(storefront_path: impl Into<String>) -> Self {
        let path = storefront_path.into();
        let path = if path.starts_with('/') { path } else { format!("/{}", path) };
        Self { storefront_path: path }
    }

    pub fn storefront_path(&self) -> &str {
        &self.storefront_path
    }
}

impl Default for StorefrontRootRewrite {
    fn default() -> Self {
        Self::new(DEFAULT_STOREFRONT_PATH)
    }
}

impl RewritePolicy for StorefrontRootRewrite {
    fn rewrite(&self, original_path: &str, _tenant: &Tenant) -> String {
        if original_path == "/" || original_path.is_empty() {
            self.storefront_path.clone()
        } else {
            original_path.to_string()
        }
    }
}
