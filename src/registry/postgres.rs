//! Postgres-backed tenant source and direct registry.
//!
//! The store-management subsystem owns the table; this module only reads
//! `id`, `domain`, `name` and `status` from it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::retry::CallPolicy;
use crate::routing::host::normalize_host;
use super::tenant::{Tenant, TenantStatus};
use super::{RegistryError, TenantRegistry, TenantSource};

#[derive(Debug, FromRow)]
struct StoreRow {
    id: String,
    domain: String,
    name: String,
    status: Option<String>,
}

impl From<StoreRow> for Tenant {
    fn from(row: StoreRow) -> Self {
        Tenant {
            id: row.id,
            domain: row.domain,
            name: row.name,
            status: row
                .status
                .as_deref()
                .map(TenantStatus::from_column)
                .unwrap_or_default(),
        }
    }
}

/// Builds a lazily connecting pool so the service can start (and report the
/// registry as unavailable) while the database is down.
pub fn lazy_pool(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<PgPool, RegistryError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_lazy(database_url)?;
    Ok(pool)
}

/// Accepts plain or schema-qualified identifiers made of `[A-Za-z0-9_]`.
fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|p| {
            !p.is_empty()
                && !p.starts_with(|c: char| c.is_ascii_digit())
                && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Quote SQL identifier (schema-qualified allowed) to prevent injection
fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|p| format!("\"{}\"", p.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn checked_table(table: &str) -> Result<String, RegistryError> {
    if !is_valid_table_name(table) {
        return Err(RegistryError::Source(format!("Invalid tenant table name: {}", table)));
    }
    Ok(quote_identifier(table))
}

fn list_query(table: &str) -> String {
    format!(
        "SELECT id::text AS id, domain, name, status::text AS status FROM {} WHERE domain IS NOT NULL",
        table
    )
}

/// SQL mirror of [`normalize_host`] for ASCII domains: trim, drop a `:port`,
/// lower-case, drop trailing dots. IDNA is not available in SQL, so
/// internationalized domains must be stored in punycode for direct lookups;
/// [`PgTenantRegistry::audit`] reports the ones that are not.
const NORMALIZED_DOMAIN_SQL: &str = "rtrim(lower(split_part(btrim(domain), ':', 1)), '.')";

fn lookup_query(table: &str) -> String {
    // Lowest id in byte order wins, as in RegistrySnapshot. `claimants`
    // counts every row sharing the domain (window runs before LIMIT).
    format!(
        "SELECT id::text AS id, domain, name, status::text AS status, count(*) OVER () AS claimants \
         FROM {} \
         WHERE {} = $1 \
         ORDER BY id::text COLLATE \"C\" \
         LIMIT 1",
        table, NORMALIZED_DOMAIN_SQL
    )
}

fn index_statement(table: &str, index_name: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (({}))",
        quote_identifier(index_name),
        table,
        NORMALIZED_DOMAIN_SQL
    )
}

/// Stored domains whose SQL-normalized form differs from [`normalize_host`],
/// as `(tenant id, stored domain, expected key)`. These never match in
/// direct mode.
fn non_canonical_domains(tenants: &[Tenant]) -> Vec<(String, String, Option<String>)> {
    tenants
        .iter()
        .filter_map(|t| {
            let expected = normalize_host(&t.domain);
            let sql_side = sql_normalized(&t.domain);
            (expected.as_deref() != Some(sql_side.as_str())).then(|| (t.id.clone(), t.domain.clone(), expected))
        })
        .collect()
}

/// Rust rendition of [`NORMALIZED_DOMAIN_SQL`].
fn sql_normalized(domain: &str) -> String {
    let host = domain.trim().split(':').next().unwrap_or("");
    host.to_lowercase().trim_end_matches('.').to_string()
}

#[derive(Debug, FromRow)]
struct LookupRow {
    id: String,
    domain: String,
    name: String,
    status: Option<String>,
    claimants: i64,
}

impl LookupRow {
    fn into_parts(self) -> (StoreRow, i64) {
        let row = StoreRow {
            id: self.id,
            domain: self.domain,
            name: self.name,
            status: self.status,
        };
        (row, self.claimants)
    }
}

/// Full listing for [`super::RegistrySync`].
pub struct PgTenantSource {
    pool: PgPool,
    table: String,
}

impl PgTenantSource {
    pub fn new(pool: PgPool, table: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            pool,
            table: checked_table(table)?,
        })
    }
}

#[async_trait]
impl TenantSource for PgTenantSource {
    fn describe(&self) -> String {
        format!("postgres:{}", self.table)
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&list_query(&self.table))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Tenant::from).collect())
    }
}

/// Per-request lookup straight against Postgres, for deployments that do not
/// keep an in-memory snapshot. Every call is bounded by the [`CallPolicy`].
pub struct PgTenantRegistry {
    pool: PgPool,
    table: String,
    query: String,
    policy: CallPolicy,
}

impl PgTenantRegistry {
    pub fn new(pool: PgPool, table: &str, policy: CallPolicy) -> Result<Self, RegistryError> {
        let table = checked_table(table)?;
        Ok(Self {
            pool,
            query: lookup_query(&table),
            table,
            policy,
        })
    }

    /// DDL for the expression index that keeps direct lookups off a table
    /// scan. The table belongs to the store-management subsystem, so this is
    /// handed to its migrations rather than run here.
    pub fn index_statement(&self) -> String {
        index_statement(&self.table, "stores_normalized_domain_idx")
    }

    /// One full scan reporting stored domains that direct lookups cannot
    /// match (non-ASCII, unusable). Returns how many were found.
    pub async fn audit(&self) -> Result<usize, RegistryError> {
        let rows: Vec<StoreRow> = self
            .policy
            .run("tenant domain audit", || async {
                let rows: Vec<StoreRow> = sqlx::query_as(&list_query(&self.table))
                    .fetch_all(&self.pool)
                    .await?;
                Ok::<_, RegistryError>(rows)
            })
            .await?;

        let tenants: Vec<Tenant> = rows.into_iter().map(Tenant::from).collect();
        let flagged = non_canonical_domains(&tenants);
        for (id, domain, expected) in &flagged {
            match expected {
                Some(expected) => tracing::warn!(
                    tenant_id = %id,
                    domain = %domain,
                    "Domain will not match direct lookups; store it as '{}'",
                    expected
                ),
                None => tracing::warn!(tenant_id = %id, domain = %domain, "Tenant domain is not a usable host"),
            }
        }
        Ok(flagged.len())
    }

    /// Pings the database with the same budget as a lookup.
    pub async fn health_check(&self) -> Result<(), RegistryError> {
        self.policy
            .run("registry health check", || async {
                sqlx::query("SELECT 1").execute(&self.pool).await?;
                Ok::<_, RegistryError>(())
            })
            .await
    }
}

#[async_trait]
impl TenantRegistry for PgTenantRegistry {
    async fn lookup_by_domain(&self, domain: &str) -> Result<Option<Arc<Tenant>>, RegistryError> {
        let row: Option<LookupRow> = self
            .policy
            .run("tenant lookup", || async {
                let row: Option<LookupRow> = sqlx::query_as(&self.query)
                    .bind(domain)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok::<_, RegistryError>(row)
            })
            .await?;

        Ok(row.map(|row| {
            let (row, claimants) = row.into_parts();
            if claimants > 1 {
                tracing::warn!(
                    domain = %domain,
                    winner = %row.id,
                    claimants,
                    "Duplicate tenant domain in registry, using lowest id"
                );
            }
            Arc::new(Tenant::from(row))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_table_names() {
        assert!(is_valid_table_name("stores"));
        assert!(is_valid_table_name("commerce.stores"));
        assert!(!is_valid_table_name("stores; DROP TABLE stores"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("1stores"));
        assert!(!is_valid_table_name(""));
    }

    #[test]
    fn quotes_each_identifier_part() {
        assert_eq!(quote_identifier("commerce.stores"), "\"commerce\".\"stores\"");
    }

    #[test]
    fn lookup_query_breaks_ties_by_id() {
        let query = lookup_query("\"stores\"");
        assert!(query.contains("ORDER BY id::text COLLATE \"C\""));
        assert!(query.contains("LIMIT 1"));
        assert!(query.contains("count(*) OVER () AS claimants"));
    }

    #[test]
    fn index_matches_lookup_predicate() {
        let query = lookup_query("\"stores\"");
        let ddl = index_statement("\"stores\"", "stores_normalized_domain_idx");
        assert!(query.contains(&format!("WHERE {} = $1", NORMALIZED_DOMAIN_SQL)));
        assert_eq!(
            ddl,
            format!(
                "CREATE INDEX IF NOT EXISTS \"stores_normalized_domain_idx\" ON \"stores\" (({}))",
                NORMALIZED_DOMAIN_SQL
            )
        );
    }

    #[test]
    fn sql_normalization_agrees_with_host_normalization_for_ascii() {
        for domain in ["Shop.Example.com", " shop.example.com. ", "shop.example.com:443", "SHOP.EXAMPLE.COM.:8443"] {
            assert_eq!(Some(sql_normalized(domain)), normalize_host(domain), "{}", domain);
        }
    }

    #[test]
    fn audit_flags_domains_direct_lookups_cannot_match() {
        let tenants = vec![
            Tenant::new("t1", "Shop.Example.com:443", "Shop"),
            Tenant::new("t2", "Café.Example", "Cafe"),
            Tenant::new("t3", "xn--caf-dma.example", "Cafe (punycode)"),
            Tenant::new("t4", "bad host", "Broken"),
        ];

        let flagged = non_canonical_domains(&tenants);
        assert_eq!(
            flagged,
            vec![
                ("t2".to_string(), "Café.Example".to_string(), Some("xn--caf-dma.example".to_string())),
                ("t4".to_string(), "bad host".to_string(), None),
            ]
        );
    }

    #[test]
    fn row_status_maps_to_tenant_status() {
        let tenant = Tenant::from(StoreRow {
            id: "t1".into(),
            domain: "shop.example.com".into(),
            name: "Shop".into(),
            status: None,
        });
        assert!(tenant.is_active());

        let tenant = Tenant::from(StoreRow {
            id: "t2".into(),
            domain: "x.example.com".into(),
            name: "X".into(),
            status: Some("suspended".into()),
        });
        assert_eq!(tenant.status, TenantStatus::Suspended);
    }

    #[tokio::test]
    async fn rejects_bad_table_for_source() {
        let pool = lazy_pool("postgres://localhost/stores", 1, Duration::from_millis(50)).unwrap();
        assert!(PgTenantSource::new(pool, "bad table").is_err());
    }
}
