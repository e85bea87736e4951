//! Tenant listing from a YAML or JSON file.
//!
//! Accepts either a bare list or a `tenants:` key:
//!
//! ```yaml
//! tenants:
//!   - id: t1
//!     domain: shop.example.com
//!     name: Example Shop
//!     status: active
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::tenant::Tenant;
use super::{RegistryError, TenantSource};

#[derive(Deserialize)]
#[serde(untagged)]
enum TenantFile {
    Wrapped { tenants: Vec<Tenant> },
    List(Vec<Tenant>),
}

pub struct FileTenantSource {
    path: PathBuf,
}

impl FileTenantSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses file contents, choosing JSON for `.json` files and YAML otherwise.
    pub fn parse(path: &Path, contents: &str) -> Result<Vec<Tenant>, RegistryError> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let parsed: TenantFile = if is_json {
            serde_json::from_str(contents).map_err(|e| RegistryError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(contents).map_err(|e| RegistryError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        Ok(match parsed {
            TenantFile::Wrapped { tenants } => tenants,
            TenantFile::List(tenants) => tenants,
        })
    }
}

#[async_trait]
impl TenantSource for FileTenantSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RegistryError::Io {
                path: self.path.clone(),
                source,
            })?;
        Self::parse(&self.path, &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TenantStatus;
    use std::io::Write;

    #[test]
    fn parses_wrapped_yaml() {
        let yaml = r#"
tenants:
  - id: t1
    domain: shop.example.com
    name: Shop
  - id: t2
    domain: paused.example.com
    name: Paused
    status: suspended
"#;
        let tenants = FileTenantSource::parse(Path::new("tenants.yaml"), yaml).unwrap();
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[1].status, TenantStatus::Suspended);
    }

    #[test]
    fn parses_bare_json_list() {
        let json = r#"[{"id":"t1","domain":"shop.example.com","name":"Shop"}]"#;
        let tenants = FileTenantSource::parse(Path::new("tenants.JSON"), json).unwrap();
        assert_eq!(tenants[0].id, "t1");
    }

    #[test]
    fn rejects_malformed_file() {
        let err = FileTenantSource::parse(Path::new("tenants.yaml"), "tenants: 12").unwrap_err();
        assert!(matches!(err, RegistryError::Parse { .. }));
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "- id: t1\n  domain: shop.example.com\n  name: Shop").unwrap();

        let source = FileTenantSource::new(file.path());
        let tenants = source.list_tenants().await.unwrap();
        assert_eq!(tenants, vec![Tenant::new("t1", "shop.example.com", "Shop")]);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = FileTenantSource::new("/definitely/not/here.yaml");
        assert!(matches!(source.list_tenants().await, Err(RegistryError::Io { .. })));
    }
}
