use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use clap::Args;

use crate::cli::utils::load_snapshot;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::registry::SnapshotRegistry;
use crate::routing::{StorefrontRootRewrite, TenantRouter};

#[derive(Args)]
pub struct RouteArgs {
    #[arg(long, help = "Host header as the client would send it (port allowed)")]
    pub host: Option<String>,

    #[arg(long, default_value = "/", help = "Request path")]
    pub path: String,

    #[arg(long = "header", value_name = "NAME:VALUE", help = "Extra request header (repeatable)")]
    pub headers: Vec<String>,
}

pub async fn handle(args: RouteArgs, tenants_file: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    if !args.path.starts_with('/') {
        return Err(anyhow!("path must start with '/': {}", args.path));
    }

    let headers = parse_headers(&args.headers)?;
    let snapshot = load_snapshot(tenants_file).await?;

    let registry = Arc::new(SnapshotRegistry::new(None));
    registry.replace(snapshot);

    let settings = &config().router;
    let router = TenantRouter::new(registry)
        .with_exclusions(settings.exclusion_list())
        .with_policy(Arc::new(StorefrontRootRewrite::new(settings.storefront_path.clone())))
        .with_identity_header(settings.identity_header_name()?);

    let decision = router.route(args.host.as_deref(), &args.path, &headers).await?;

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&decision.summary())?);
        }
        OutputFormat::Text => {
            match (&decision.tenant, decision.reason) {
                (Some(tenant), _) => println!("Rewrite -> tenant {} ({})", tenant.id, tenant.name),
                (None, Some(reason)) => println!("Passthrough ({:?})", reason),
                (None, None) => println!("Passthrough"),
            }
            println!("Path: {} -> {}", decision.original_path, decision.rewritten_path);
            for (name, value) in decision.forwarded_headers.iter() {
                println!("  {}: {}", name, String::from_utf8_lossy(value.as_bytes()));
            }
        }
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| anyhow!("header '{}' must look like NAME:VALUE", entry))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name in '{}'", entry))?;
        let value = HeaderValue::from_str(value.trim()).with_context(|| format!("invalid header value in '{}'", entry))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_headers() {
        let headers = parse_headers(&["x-store-id: forged".to_string(), "Accept:text/html".to_string()]).unwrap();
        assert_eq!(headers.get("x-store-id").unwrap(), "forged");
        assert_eq!(headers.get("accept").unwrap(), "text/html");
    }

    #[test]
    fn rejects_header_without_separator() {
        assert!(parse_headers(&["no-separator".to_string()]).is_err());
    }
}
