//! Emporium CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema and session store)
//! emporium migrate
//!
//! # Grant the admin role to an existing account
//! emporium admin promote -e admin@example.com
//!
//! # Load demo catalog and storefront content
//! emporium seed
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database with demo categories, products and content
    Seed,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to a registered user
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium_cli=info,emporium_server=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::promote(&email).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_promote() {
        let cli = Cli::try_parse_from(["emporium", "admin", "promote", "-e", "a@b.co"]).unwrap();
        match cli.command {
            Commands::Admin {
                action: AdminAction::Promote { email },
            } => assert_eq!(email, "a@b.co"),
            _ => panic!("expected admin promote"),
        }
    }

    #[test]
    fn test_promote_requires_email() {
        assert!(Cli::try_parse_from(["emporium", "admin", "promote"]).is_err());
    }
}
