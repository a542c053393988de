pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::types::Role;

#[derive(Parser)]
#[command(name = "saas-platform")]
#[command(about = "Multi-tenant SaaS platform API server and admin tooling")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, help = "Use in-memory stores instead of PostgreSQL")]
        memory: bool,
        #[arg(long, help = "Load demo data before serving")]
        seed: bool,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Mint a signed bearer token for local testing")]
    Token {
        #[arg(long, help = "Subject (user email)")]
        sub: String,
        #[arg(long, help = "Role: super_admin, tenant_admin or user")]
        role: Role,
        #[arg(long, help = "Tenant id claim")]
        tenant: Option<String>,
    },

    #[command(about = "Insert demo tenants, users and projects (idempotent)")]
    Seed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Serve { memory, seed } => commands::serve::handle(memory, seed).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Token { sub, role, tenant } => {
            commands::token::handle(&sub, role, tenant.as_deref(), output_format)
        }
        Commands::Seed => commands::seed::handle(output_format).await,
    }
}
