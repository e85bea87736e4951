//! Host header extraction and normalization.
//!
//! Lookups are case-insensitive: both registry domains and request hosts go
//! through [`normalize_host`] so `Shop.Example.com:8443` and
//! `shop.example.com` resolve to the same key.

use axum::http::{header, HeaderMap, Uri};

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Normalizes a raw host (as found in a `Host` header or a registry record).
///
/// Strips an optional port (bracket-aware for IPv6), surrounding whitespace and
/// a trailing root dot, then lets `url::Host` lower-case and IDNA-encode the
/// name. Returns `None` when nothing usable is left.
pub fn normalize_host(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_port = strip_port(trimmed);
    let without_dot = without_port.trim_end_matches('.');
    if without_dot.is_empty() {
        return None;
    }

    match url::Host::parse(without_dot) {
        Ok(host) => Some(host.to_string()),
        Err(e) => {
            tracing::debug!("Unparsable host '{}': {}", raw, e);
            None
        }
    }
}

/// Removes a trailing `:port` if present.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8080 -> [::1]
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }

    match host.rsplit_once(':') {
        // A bare IPv6 literal has several colons and no port to strip
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Picks the request host from `X-Forwarded-Host` (only when the deployment
/// sits behind a trusted proxy), then the `Host` header, then the URI authority.
pub fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri, trust_forwarded: bool) -> Option<&'a str> {
    if trust_forwarded {
        let forwarded = headers
            .get(FORWARDED_HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .or_else(|| uri.authority().map(|a| a.as_str()))
}
