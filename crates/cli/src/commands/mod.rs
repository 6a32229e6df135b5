//! Subcommand implementations.

pub mod agents;
pub mod catalog;
pub mod quote;

use std::path::Path;

use progear_agent_api::config::ConfigError;
use progear_agent_api::exchange::ExchangeError;
use progear_core::{AgentKind, Catalog, CatalogError, PricingError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// `catalog validate` found problems.
    #[error("{0} catalog problems found")]
    Invalid(usize),

    #[error("Invalid item {0:?}, expected PRODUCT:QTY")]
    InvalidItem(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Agent {0} has no {1} configured")]
    MissingCredential(AgentKind, &'static str),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Load `file`, or the bundled catalog when no file is given.
pub fn load_catalog(file: Option<&Path>) -> Result<Catalog, CliError> {
    let catalog = match file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading catalog");
            Catalog::from_path(path)?
        }
        None => Catalog::builtin()?,
    };
    Ok(catalog)
}
