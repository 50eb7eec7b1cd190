//! Thrift store CLI: database migrations, seeding and staff accounts.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! ts-cli migrate
//!
//! # Load categories, products, help articles and staff from YAML
//! ts-cli seed crates/cli/seed/sample.yaml
//!
//! # Create a staff account
//! ts-cli staff create -e admin@example.com -n "Amina Otieno" -r admin -p 'long passphrase'
//! ```
//!
//! Every command reads `DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "Thrift store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from a YAML file
    Seed {
        /// Path to the seed file
        file: String,
    },
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Create a staff account
    Create {
        /// Email address used to sign in
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `product_manager`, `order_preparer`, `delivery_staff`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            let summary = commands::seed::from_file(&file).await?;
            tracing::info!(%summary, "Seeding complete");
        }
        Commands::Staff { action } => match action {
            StaffAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::staff::create(&email, &name, &role, password).await?;
            }
        },
    }
    Ok(())
}
