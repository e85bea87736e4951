pub mod route;
pub mod tenants;
