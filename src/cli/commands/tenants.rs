use std::path::Path;

use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List tenants and the domain each one serves")]
    List,

    #[command(about = "Report duplicate domains and unusable entries (exit 1 on conflicts)")]
    Check,
}

pub async fn handle(cmd: TenantCommands, tenants_file: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = load_snapshot(tenants_file).await?;

    match cmd {
        TenantCommands::List => {
            if snapshot.tenants().is_empty() {
                return output_empty_collection(&output_format, "tenants", "No tenants configured");
            }

            match output_format {
                OutputFormat::Json => {
                    let tenants: Vec<_> = snapshot.tenants().iter().map(|t| t.as_ref()).collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "file": tenants_file,
                            "tenants": tenants,
                        }))?
                    );
                }
                OutputFormat::Text => {
                    println!("Tenants in {}:", tenants_file.display());
                    for tenant in snapshot.tenants() {
                        println!("  {:<20} {:<32} {:?}  {}", tenant.id, tenant.domain, tenant.status, tenant.name);
                    }
                }
            }
            Ok(())
        }

        TenantCommands::Check => {
            let conflicts = snapshot.conflicts();
            let skipped = snapshot.skipped();
            let details = json!({
                "file": tenants_file,
                "tenants": snapshot.len(),
                "conflicts": conflicts,
                "skipped": skipped,
            });

            if let OutputFormat::Text = output_format {
                for conflict in conflicts {
                    println!(
                        "Duplicate domain {}: claimed by {} (serving {})",
                        conflict.domain,
                        conflict.tenant_ids.join(", "),
                        conflict.winner
                    );
                }
                for id in skipped {
                    println!("Skipped tenant {}: domain is not a usable host", id);
                }
            }

            if conflicts.is_empty() {
                output_success(
                    &output_format,
                    &format!("{} tenants, no duplicate domains", snapshot.len()),
                    Some(details),
                )
            } else {
                output_error(
                    &output_format,
                    &format!("{} duplicate domain(s) in {}", conflicts.len(), tenants_file.display()),
                    Some(details),
                )?;
                Err(anyhow!("tenant file has duplicate domains"))
            }
        }
    }
}
