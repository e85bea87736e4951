//! Immutable, pre-indexed view of all known tenants.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::routing::host::normalize_host;

use super::tenant::Tenant;

/// Two or more tenants claiming the same normalized domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainConflict {
    pub domain: String,
    /// Identifier that wins lookups for this domain.
    pub winner: String,
    /// Every tenant id that claims the domain, in tie-break order.
    pub tenant_ids: Vec<String>,
}

/// Point-in-time registry contents.
///
/// Built once from a tenant listing and never mutated afterwards; updates
/// replace the whole snapshot. Domains are keyed by their normalized form.
/// When several tenants claim one domain, the lowest `id` (byte order) wins.
#[derive(Debug)]
pub struct RegistrySnapshot {
    by_domain: HashMap<String, Arc<Tenant>>,
    tenants: Vec<Arc<Tenant>>,
    conflicts: Vec<DomainConflict>,
    skipped: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    pub fn build(tenants: Vec<Tenant>) -> Self {
        let mut tenants: Vec<Arc<Tenant>> = tenants.into_iter().map(Arc::new).collect();
        tenants.sort_by(|a, b| a.id.as_bytes().cmp(b.id.as_bytes()));

        let mut claims: HashMap<String, Vec<Arc<Tenant>>> = HashMap::with_capacity(tenants.len());
        let mut skipped = Vec::new();

        for tenant in &tenants {
            match normalize_host(&tenant.domain) {
                Some(domain) => claims.entry(domain).or_default().push(Arc::clone(tenant)),
                None => {
                    tracing::warn!(tenant_id = %tenant.id, domain = %tenant.domain, "Skipping tenant with unusable domain");
                    skipped.push(tenant.id.clone());
                }
            }
        }

        let mut by_domain = HashMap::with_capacity(claims.len());
        let mut conflicts = Vec::new();

        for (domain, claimants) in claims {
            // claimants inherit the id ordering from `tenants`
            let winner = Arc::clone(&claimants[0]);
            if claimants.len() > 1 {
                let tenant_ids: Vec<String> = claimants.iter().map(|t| t.id.clone()).collect();
                tracing::warn!(
                    domain = %domain,
                    winner = %winner.id,
                    tenants = ?tenant_ids,
                    "Duplicate tenant domain in registry, using lowest id"
                );
                conflicts.push(DomainConflict {
                    domain: domain.clone(),
                    winner: winner.id.clone(),
                    tenant_ids,
                });
            }
            by_domain.insert(domain, winner);
        }

        conflicts.sort_by(|a, b| a.domain.cmp(&b.domain));

        Self {
            by_domain,
            tenants,
            conflicts,
            skipped,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    /// Looks up an already-normalized domain.
    pub fn get(&self, normalized_domain: &str) -> Option<&Arc<Tenant>> {
        self.by_domain.get(normalized_domain)
    }

    /// Normalizes `domain` and looks it up.
    pub fn lookup(&self, domain: &str) -> Option<&Arc<Tenant>> {
        normalize_host(domain).and_then(|d| self.by_domain.get(&d))
    }

    /// All tenants ordered by id.
    pub fn tenants(&self) -> &[Arc<Tenant>] {
        &self.tenants
    }

    pub fn conflicts(&self) -> &[DomainConflict] {
        &self.conflicts
    }

    /// Ids of tenants whose domain could not be normalized.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenants() -> Vec<Tenant> {
        vec![
            Tenant::new("t2", "other.example.com", "Other"),
            Tenant::new("t1", "Shop.Example.com", "Shop"),
        ]
    }

    #[test]
    fn indexes_by_normalized_domain() {
        let snapshot = RegistrySnapshot::build(tenants());
        assert_eq!(snapshot.lookup("shop.example.com").unwrap().id, "t1");
        assert_eq!(snapshot.lookup("SHOP.example.com:443").unwrap().id, "t1");
        assert_eq!(snapshot.get("other.example.com").unwrap().id, "t2");
        assert!(snapshot.lookup("missing.example.com").is_none());
        assert!(snapshot.conflicts().is_empty());
    }

    #[test]
    fn tenants_are_ordered_by_id() {
        let snapshot = RegistrySnapshot::build(tenants());
        let ids: Vec<&str> = snapshot.tenants().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[test]
    fn duplicate_domain_picks_lowest_id() {
        let snapshot = RegistrySnapshot::build(vec![
            Tenant::new("store-b", "dup.example.com", "B"),
            Tenant::new("store-c", "DUP.example.com", "C"),
            Tenant::new("store-a", "dup.example.com", "A"),
        ]);

        assert_eq!(snapshot.lookup("dup.example.com").unwrap().id, "store-a");
        assert_eq!(
            snapshot.conflicts(),
            &[DomainConflict {
                domain: "dup.example.com".to_string(),
                winner: "store-a".to_string(),
                tenant_ids: vec!["store-a".into(), "store-b".into(), "store-c".into()],
            }]
        );
    }

    #[test]
    fn duplicate_winner_does_not_depend_on_input_order() {
        let forward = RegistrySnapshot::build(vec![
            Tenant::new("x1", "dup.example.com", "X1"),
            Tenant::new("x2", "dup.example.com", "X2"),
        ]);
        let reverse = RegistrySnapshot::build(vec![
            Tenant::new("x2", "dup.example.com", "X2"),
            Tenant::new("x1", "dup.example.com", "X1"),
        ]);
        assert_eq!(forward.lookup("dup.example.com").unwrap().id, "x1");
        assert_eq!(reverse.lookup("dup.example.com").unwrap().id, "x1");
    }

    #[test]
    fn unusable_domains_are_skipped() {
        let snapshot = RegistrySnapshot::build(vec![
            Tenant::new("t1", "", "Empty"),
            Tenant::new("t2", "ok.example.com", "Ok"),
        ]);
        assert_eq!(snapshot.skipped(), &["t1".to_string()]);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.lookup("ok.example.com").is_some());
    }
}
