use serde::{Deserialize, Serialize};

/// Lifecycle flag for a store. Carried through to downstream handlers,
/// the router itself does not gate on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
}

impl TenantStatus {
    /// Parses the stored status column. Unknown values map to `Suspended`.
    pub fn from_column(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => TenantStatus::Active,
            _ => TenantStatus::Suspended,
        }
    }
}

/// One merchant store as published by the store-management subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub domain: String,
    pub name: String,
    #[serde(default)]
    pub status: TenantStatus,
}

impl Tenant {
    pub fn new(id: impl Into<String>, domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            name: name.into(),
            status: TenantStatus::Active,
        }
    }

    pub fn with_status(mut self, status: TenantStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}
