pub mod commands;
pub mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "routerctl")]
#[command(about = "routerctl - inspect tenant files and dry-run host routing")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Tenant file (YAML or JSON); defaults to REGISTRY_FILE or the environment preset"
    )]
    pub tenants: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Dry-run one request through the tenant router")]
    Route(commands::route::RouteArgs),

    #[command(about = "Tenant file inspection")]
    Tenants {
        #[command(subcommand)]
        cmd: commands::tenants::TenantCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let tenants_file = cli
        .tenants
        .unwrap_or_else(|| crate::config::config().registry.file_path.clone());

    match cli.command {
        Commands::Route(args) => commands::route::handle(args, &tenants_file, output_format).await,
        Commands::Tenants { cmd } => commands::tenants::handle(cmd, &tenants_file, output_format).await,
    }
}
