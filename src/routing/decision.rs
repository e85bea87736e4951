use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::Tenant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAction {
    /// Tenant matched: forward with identity header and (possibly) new path.
    Rewrite,
    /// Forward unchanged to the default route table.
    Passthrough,
}

/// Why a request was passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughReason {
    /// Path is on the exclusion list; the registry was never consulted.
    Excluded,
    /// No usable host on the request.
    MissingHost,
    /// Host is not a tenant domain.
    NoMatch,
}

/// Outcome of routing one request. Built fresh per request and never stored.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub action: RouteAction,
    pub reason: Option<PassthroughReason>,
    pub tenant: Option<Arc<Tenant>>,
    pub original_path: String,
    pub rewritten_path: String,
    pub forwarded_headers: HeaderMap,
}

impl RoutingDecision {
    pub(crate) fn passthrough(reason: PassthroughReason, path: &str, headers: HeaderMap) -> Self {
        Self {
            action: RouteAction::Passthrough,
            reason: Some(reason),
            tenant: None,
            original_path: path.to_string(),
            rewritten_path: path.to_string(),
            forwarded_headers: headers,
        }
    }

    pub(crate) fn rewrite(tenant: Arc<Tenant>, path: &str, rewritten_path: String, headers: HeaderMap) -> Self {
        Self {
            action: RouteAction::Rewrite,
            reason: None,
            tenant: Some(tenant),
            original_path: path.to_string(),
            rewritten_path,
            forwarded_headers: headers,
        }
    }

    pub fn matched_tenant_id(&self) -> Option<&str> {
        self.tenant.as_ref().map(|t| t.id.as_str())
    }

    pub fn is_rewrite(&self) -> bool {
        self.action == RouteAction::Rewrite
    }

    pub fn path_changed(&self) -> bool {
        self.original_path != self.rewritten_path
    }

    /// JSON view used by the CLI dry-run and debug logs. A header sent more
    /// than once becomes an array of its values.
    pub fn summary(&self) -> Value {
        let mut headers = serde_json::Map::new();
        for name in self.forwarded_headers.keys() {
            let mut values: Vec<Value> = self
                .forwarded_headers
                .get_all(name)
                .iter()
                .map(|value| Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()))
                .collect();
            let entry = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            headers.insert(name.as_str().to_string(), entry);
        }

        json!({
            "action": self.action,
            "reason": self.reason,
            "matched_tenant_id": self.matched_tenant_id(),
            "tenant": self.tenant.as_deref(),
            "original_path": self.original_path,
            "rewritten_path": self.rewritten_path,
            "forwarded_headers": headers,
        })
    }
}
