//! Offline quotes.
//!
//! Prices a quote with the same rules as the tool server's `create_quote`
//! and prints it as JSON.

use std::path::Path;

use chrono::Utc;
use progear_core::{ProductId, QuoteItem, pricing};

use super::{CliError, load_catalog};

/// Parse a `PRODUCT:QTY` argument.
///
/// # Errors
///
/// Returns `CliError::InvalidItem` when the separator is missing or the
/// quantity is not a positive integer.
pub fn parse_item(arg: &str) -> Result<QuoteItem, CliError> {
    let invalid = || CliError::InvalidItem(arg.to_string());
    let (product, qty) = arg.rsplit_once(':').ok_or_else(invalid)?;
    let product = product.trim();
    let qty: u32 = qty.trim().parse().map_err(|_| invalid())?;
    if product.is_empty() || qty == 0 {
        return Err(invalid());
    }

    Ok(QuoteItem {
        product_id: ProductId::new(product.to_ascii_uppercase()),
        qty,
    })
}

/// Price a quote and print it.
///
/// # Errors
///
/// Returns an error for malformed items, an unknown customer, or a catalog
/// that cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn run(customer: &str, items: &[String], file: Option<&Path>) -> Result<(), CliError> {
    let items = items
        .iter()
        .map(|arg| parse_item(arg))
        .collect::<Result<Vec<_>, _>>()?;
    let catalog = load_catalog(file)?;

    let quote = pricing::quote(&catalog, customer, &items, Utc::now())?;
    if quote.items.len() < items.len() {
        tracing::warn!(
            requested = items.len(),
            priced = quote.items.len(),
            "Unknown products were left out of the quote"
        );
    }

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        let item = parse_item("bb-pro-001:600").unwrap();
        assert_eq!(item.product_id, ProductId::new("BB-PRO-001"));
        assert_eq!(item.qty, 600);
    }

    #[test]
    fn test_parse_item_rejects_malformed() {
        for arg in ["BB-PRO-001", "BB-PRO-001:", ":5", "BB-PRO-001:0", "BB-PRO-001:-2"] {
            assert!(
                matches!(parse_item(arg), Err(CliError::InvalidItem(_))),
                "{arg} should be rejected"
            );
        }
    }

    #[test]
    fn test_run_unknown_customer() {
        let err = run("CUST-999", &["BB-PRO-001:1".to_string()], None).unwrap_err();
        assert!(matches!(err, CliError::Pricing(_)));
    }
}
