//! Template Shop CLI - Backend checks and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Check configuration and backend connectivity
//! ts-cli check
//!
//! # Grant or revoke back-office access
//! ts-cli admin grant -e admin@example.com
//! ts-cli admin revoke -e admin@example.com
//!
//! # Seed categories and products from a YAML file
//! ts-cli seed -f catalog.yaml
//! ```
//!
//! # Commands
//!
//! - `check` - Validate configuration and ping the backend
//! - `admin grant` / `admin revoke` - Change a user's role
//! - `seed` - Create catalog entries that do not exist yet
//!
//! Administration commands act with the service-role key
//! (`BACKEND_SERVICE_KEY`), which bypasses row-level security.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "Template Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and check that the backend answers
    Check,
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed categories and products from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(short, long, default_value = "catalog.yaml")]
        file: String,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give a user back-office access
    Grant {
        /// Email address of an existing account
        #[arg(short, long)]
        email: String,
    },
    /// Take back-office access away from a user
    Revoke {
        /// Email address of an existing account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Check => commands::check::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::grant(&email).await?,
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
        },
        Commands::Seed { file, dry_run } => commands::seed::catalog(&file, dry_run).await?,
    }
    Ok(())
}
