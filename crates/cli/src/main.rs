//! ProGear CLI - Catalog checks, offline quotes and agent credential tools.
//!
//! # Usage
//!
//! ```bash
//! # Check the bundled catalog (or a replacement file) for problems
//! progear-cli catalog validate
//! progear-cli catalog validate --file data/catalog.yaml
//!
//! # Product counts per category, customers per tier
//! progear-cli catalog summary
//!
//! # Price a quote without the tool server
//! progear-cli quote --customer CUST-001 --item BB-PRO-001:600 --item HP-PRO-001:2
//!
//! # Show agents, scopes and whether their credentials are set
//! progear-cli agents
//!
//! # Mint a client assertion for the configured inventory agent
//! progear-cli assertion --agent inventory
//! ```
//!
//! # Commands
//!
//! - `catalog validate` / `catalog summary` - Catalog checks
//! - `quote` - Offline quote as JSON
//! - `agents` - Agent registry and configuration state
//! - `assertion` - RS256 client assertion for an agent

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use progear_core::AgentKind;

mod commands;

#[derive(Parser)]
#[command(name = "progear-cli")]
#[command(author, version, about = "ProGear sales tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Price a quote offline
    Quote {
        /// Customer id, e.g. CUST-001
        #[arg(short, long)]
        customer: String,

        /// Quote line as PRODUCT:QTY (repeatable)
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// Catalog file (defaults to the bundled data)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List agents and their configuration state
    Agents,
    /// Mint a client assertion for an agent
    Assertion {
        /// Agent kind (`sales`, `inventory`, `customer`, `pricing`)
        #[arg(short, long)]
        agent: AgentKind,

        /// Audience (defaults to the org token endpoint)
        #[arg(long)]
        audience: Option<String>,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Check references, duplicates and discount tables
    Validate {
        /// Catalog file (defaults to the bundled data)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Product counts per category and customer counts per tier
    Summary {
        /// Catalog file (defaults to the bundled data)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Validate { file } => commands::catalog::validate(file.as_deref())?,
            CatalogAction::Summary { file } => commands::catalog::summary(file.as_deref())?,
        },
        Commands::Quote {
            customer,
            items,
            file,
        } => commands::quote::run(&customer, &items, file.as_deref())?,
        Commands::Agents => commands::agents::list()?,
        Commands::Assertion { agent, audience } => {
            commands::agents::assertion(agent, audience.as_deref())?;
        }
    }
    Ok(())
}
