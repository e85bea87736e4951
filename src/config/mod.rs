use std::env;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderName;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::CallPolicy;
use crate::routing::{ExclusionList, DEFAULT_EXCLUDED_PREFIXES, DEFAULT_IDENTITY_HEADER, DEFAULT_STOREFRONT_PATH};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid identity header name: {0}")]
    InvalidHeaderName(String),

    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Direct registry lookups require the postgres source")]
    DirectModeRequiresPostgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub router: RouterConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
    /// Serve the `/api/root/tenants` inspection endpoints.
    pub enable_admin_api: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Path prefixes that bypass tenant routing, checked in order.
    pub excluded_prefixes: Vec<String>,
    /// Also bypass any path whose last segment has a file extension.
    pub exclude_file_assets: bool,
    /// Internal route serving a tenant's domain root.
    pub storefront_path: String,
    /// Header carrying the resolved tenant id to downstream handlers.
    pub identity_header: String,
    /// Read the host from `X-Forwarded-Host` (only behind a trusted proxy).
    pub trust_forwarded_host: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrySourceKind {
    File,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    /// In-memory snapshot refreshed in the background.
    Snapshot,
    /// One database query per request.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub source: RegistrySourceKind,
    pub mode: RegistryMode,
    pub file_path: PathBuf,
    pub database_url: Option<String>,
    pub table: String,
    pub max_connections: u32,
    pub timeout_ms: u64,
    pub retries: u32,
    pub refresh_interval_secs: u64,
    /// 0 disables the staleness cutoff.
    pub max_staleness_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("ROUTER_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_ADMIN_API") {
            self.server.enable_admin_api = v.parse().unwrap_or(self.server.enable_admin_api);
        }

        // Router overrides
        if let Ok(v) = env::var("ROUTER_EXCLUDED_PREFIXES") {
            self.router.excluded_prefixes = split_list(&v);
        }
        if let Ok(v) = env::var("ROUTER_EXCLUDE_FILE_ASSETS") {
            self.router.exclude_file_assets = v.parse().unwrap_or(self.router.exclude_file_assets);
        }
        if let Ok(v) = env::var("ROUTER_STOREFRONT_PATH") {
            self.router.storefront_path = v;
        }
        if let Ok(v) = env::var("ROUTER_IDENTITY_HEADER") {
            self.router.identity_header = v;
        }
        if let Ok(v) = env::var("ROUTER_TRUST_FORWARDED_HOST") {
            self.router.trust_forwarded_host = v.parse().unwrap_or(self.router.trust_forwarded_host);
        }

        // Registry overrides
        match env::var("REGISTRY_SOURCE").as_deref() {
            Ok("postgres") | Ok("pg") => self.registry.source = RegistrySourceKind::Postgres,
            Ok("file") => self.registry.source = RegistrySourceKind::File,
            _ => {}
        }
        match env::var("REGISTRY_MODE").as_deref() {
            Ok("direct") => self.registry.mode = RegistryMode::Direct,
            Ok("snapshot") => self.registry.mode = RegistryMode::Snapshot,
            _ => {}
        }
        if let Ok(v) = env::var("REGISTRY_FILE") {
            self.registry.file_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.registry.database_url = Some(v);
        }
        if let Ok(v) = env::var("REGISTRY_TABLE") {
            self.registry.table = v;
        }
        if let Ok(v) = env::var("REGISTRY_MAX_CONNECTIONS") {
            self.registry.max_connections = v.parse().unwrap_or(self.registry.max_connections);
        }
        if let Ok(v) = env::var("REGISTRY_TIMEOUT_MS") {
            self.registry.timeout_ms = v.parse().unwrap_or(self.registry.timeout_ms);
        }
        if let Ok(v) = env::var("REGISTRY_RETRIES") {
            self.registry.retries = v.parse().unwrap_or(self.registry.retries);
        }
        if let Ok(v) = env::var("REGISTRY_REFRESH_SECS") {
            self.registry.refresh_interval_secs = v.parse().unwrap_or(self.registry.refresh_interval_secs);
        }
        if let Ok(v) = env::var("REGISTRY_MAX_STALENESS_SECS") {
            self.registry.max_staleness_secs = v.parse().unwrap_or(self.registry.max_staleness_secs);
        }

        self
    }

    /// Catches combinations that cannot be served before anything starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.router.identity_header_name()?;

        if self.registry.mode == RegistryMode::Direct && self.registry.source != RegistrySourceKind::Postgres {
            return Err(ConfigError::DirectModeRequiresPostgres);
        }
        if self.registry.source == RegistrySourceKind::Postgres {
            self.registry.database_url()?;
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                enable_request_logging: true,
                enable_admin_api: true,
            },
            router: RouterConfig::default(),
            registry: RegistryConfig {
                source: RegistrySourceKind::File,
                mode: RegistryMode::Snapshot,
                file_path: PathBuf::from("fixtures/tenants.yaml"),
                database_url: None,
                table: "stores".to_string(),
                max_connections: 5,
                timeout_ms: 2000,
                retries: 1,
                refresh_interval_secs: 5,
                max_staleness_secs: 0,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                enable_request_logging: true,
                enable_admin_api: true,
            },
            router: RouterConfig {
                trust_forwarded_host: true,
                ..RouterConfig::default()
            },
            registry: RegistryConfig {
                source: RegistrySourceKind::Postgres,
                mode: RegistryMode::Snapshot,
                file_path: PathBuf::from("tenants.yaml"),
                database_url: None,
                table: "stores".to_string(),
                max_connections: 5,
                timeout_ms: 1000,
                retries: 1,
                refresh_interval_secs: 30,
                max_staleness_secs: 600,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                enable_cors: false,
                enable_request_logging: false,
                enable_admin_api: false,
            },
            router: RouterConfig {
                trust_forwarded_host: true,
                ..RouterConfig::default()
            },
            registry: RegistryConfig {
                source: RegistrySourceKind::Postgres,
                mode: RegistryMode::Snapshot,
                file_path: PathBuf::from("tenants.yaml"),
                database_url: None,
                table: "stores".to_string(),
                max_connections: 10,
                timeout_ms: 250,
                retries: 1,
                refresh_interval_secs: 15,
                max_staleness_secs: 300,
            },
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            exclude_file_assets: true,
            storefront_path: DEFAULT_STOREFRONT_PATH.to_string(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            trust_forwarded_host: false,
        }
    }
}

impl RouterConfig {
    pub fn exclusion_list(&self) -> ExclusionList {
        ExclusionList::new(&self.excluded_prefixes, self.exclude_file_assets)
    }

    pub fn identity_header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.identity_header.trim().to_ascii_lowercase().as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(self.identity_header.clone()))
    }
}

impl RegistryConfig {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(Duration::from_millis(self.timeout_ms), self.retries)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn max_staleness(&self) -> Option<Duration> {
        (self.max_staleness_secs > 0).then(|| Duration::from_secs(self.max_staleness_secs))
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        let raw = self.database_url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))?;
        url::Url::parse(raw).map_err(|_| ConfigError::InvalidDatabaseUrl)?;
        Ok(raw)
    }

    /// Database URL with the password masked, for logs.
    pub fn redacted_database_url(&self) -> Option<String> {
        let raw = self.database_url.as_deref()?;
        let mut url = url::Url::parse(raw).ok()?;
        if url.password().is_some() {
            let _ = url.set_password(Some("****"));
        }
        Some(url.into())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
