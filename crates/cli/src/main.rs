//! SSS CLI - drive sessions and recipe favorites against Firebase.
//!
//! # Usage
//!
//! ```bash
//! # Start a guest session on this machine
//! sss guest
//!
//! # Favorite a recipe (toggle again to remove it)
//! sss toggle soup.json
//!
//! # List favorites as a signed-in user (password from SSS_PASSWORD or stdin)
//! SSS_PASSWORD=... sss --email cook@example.com favorites
//!
//! # Create an account
//! sss --email cook@example.com sign-up --name "Cook"
//! ```
//!
//! # Commands
//!
//! - `whoami` - Show the active identity
//! - `profile` - Print the profile document
//! - `favorites` - Print favorite recipes in order
//! - `toggle` - Favorite or unfavorite a recipe read from a JSON file
//! - `allergies` - Replace the allergy list
//! - `sign-up` - Create an account
//! - `guest` - Start a fresh guest session
//! - `sign-out` - Sign out and forget the guest session
//!
//! Without `--email`, data commands act as the stored guest, creating one on
//! first use.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sss_client::{ClientConfig, Result, telemetry};

mod commands;

#[derive(Parser)]
#[command(name = "sss")]
#[command(author, version, about = "SSS recipe favorites CLI")]
struct Cli {
    /// Sign in with this email (password from `SSS_PASSWORD` or stdin)
    #[arg(short, long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active identity
    Whoami,
    /// Print the profile document as JSON
    Profile,
    /// Print favorite recipes as JSON
    Favorites,
    /// Favorite or unfavorite a recipe
    Toggle {
        /// JSON file holding the recipe (must have an "id")
        recipe: PathBuf,
    },
    /// Replace the allergy list
    Allergies {
        /// Allergy names
        items: Vec<String>,
    },
    /// Create an account with the global --email
    SignUp {
        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Start a fresh guest session
    Guest,
    /// Sign out and forget the guest session
    SignOut,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            std::process::exit(2);
        }
    };

    // Sentry first so the tracing layer has a client to report to
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing();

    if let Err(e) = run(cli, &config).await {
        let e = e.capture();
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<()> {
    let ctx = commands::Context::connect(config)?;
    let email = cli.email.as_deref();

    match cli.command {
        Commands::Whoami => commands::session::whoami(&ctx, email).await?,
        Commands::Profile => commands::favorites::profile(&ctx, email).await?,
        Commands::Favorites => commands::favorites::list(&ctx, email).await?,
        Commands::Toggle { recipe } => commands::favorites::toggle(&ctx, email, &recipe).await?,
        Commands::Allergies { items } => {
            commands::favorites::allergies(&ctx, email, &items).await?;
        }
        Commands::SignUp { name } => commands::session::sign_up(&ctx, email, &name).await?,
        Commands::Guest => commands::session::guest(&ctx)?,
        Commands::SignOut => commands::session::sign_out(&ctx).await?,
    }

    ctx.session.dispose();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_and_version_need_no_environment() {
        let help = Cli::try_parse_from(["sss", "--help"]).err().unwrap();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);

        let version = Cli::try_parse_from(["sss", "--version"]).err().unwrap();
        assert_eq!(version.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_global_email_after_subcommand() {
        let cli =
            Cli::try_parse_from(["sss", "sign-up", "--name", "Cook", "-e", "cook@sss.test"])
                .unwrap();
        assert_eq!(cli.email.as_deref(), Some("cook@sss.test"));
        assert!(matches!(cli.command, Commands::SignUp { name } if name == "Cook"));
    }
}
