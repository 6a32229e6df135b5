//! Catalog inspection commands.
//!
//! # Usage
//!
//! ```bash
//! progear-cli catalog validate --file data/catalog.yaml
//! progear-cli catalog summary
//! ```

use std::path::Path;

use progear_core::{Catalog, CatalogError, CustomerTier};
use tracing::{error, info};

use super::{CliError, load_catalog};

/// Check a catalog and log every problem found.
///
/// # Errors
///
/// Returns `CliError::Invalid` when the catalog has problems, or a load
/// error if the file cannot be read or parsed.
pub fn validate(file: Option<&Path>) -> Result<(), CliError> {
    let catalog = match load_catalog(file) {
        Ok(catalog) => catalog,
        Err(CliError::Catalog(CatalogError::Invalid(problems))) => {
            error!("Catalog validation failed:");
            for problem in &problems {
                error!("  - {problem}");
            }
            return Err(CliError::Invalid(problems.len()));
        }
        Err(e) => return Err(e),
    };

    info!(
        products = catalog.products.len(),
        customers = catalog.customers.len(),
        orders = catalog.orders.len(),
        categories = catalog.categories().len(),
        "Catalog is valid"
    );
    Ok(())
}

/// Counts shown by `catalog summary`.
#[derive(Debug, PartialEq, Eq)]
pub struct CatalogSummary<'a> {
    /// Product count per category, in catalog order.
    pub categories: Vec<(&'a str, usize)>,
    /// Customer count per tier, highest tier first. Empty tiers are listed.
    pub tiers: Vec<(CustomerTier, usize)>,
    pub orders: usize,
}

impl<'a> CatalogSummary<'a> {
    #[must_use]
    pub fn of(catalog: &'a Catalog) -> Self {
        let categories = catalog
            .categories()
            .into_iter()
            .map(|category| (category, catalog.products_in_category(category).count()))
            .collect();
        let tiers = CustomerTier::ALL
            .into_iter()
            .map(|tier| {
                let count = catalog.customers.iter().filter(|c| c.tier == tier).count();
                (tier, count)
            })
            .collect();

        Self {
            categories,
            tiers,
            orders: catalog.orders.len(),
        }
    }
}

/// Log product and customer counts.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn summary(file: Option<&Path>) -> Result<(), CliError> {
    let catalog = load_catalog(file)?;
    let summary = CatalogSummary::of(&catalog);

    info!("Catalog Summary");
    info!("===============");
    info!("Products by category:");
    for (category, count) in &summary.categories {
        info!("  {category}: {count}");
    }
    info!("Customers by tier:");
    for (tier, count) in &summary.tiers {
        info!("  {tier}: {count}");
    }
    info!("Orders: {}", summary.orders);

    Ok(())
}
