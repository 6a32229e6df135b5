//! Pricing rules: margins, volume and tier discounts, quotes and bulk prices.
//!
//! Every amount is computed with `Decimal`, so a quote for 600 balls at
//! $149.99 is exactly $89,994.00 before discounts. Only the final discount
//! amount is rounded (to cents).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::catalog::{Catalog, DiscountTiers, VolumeTier};
use crate::types::{
    CURRENCY, CustomerId, CustomerTier, ProductId, QuoteId, format_percent, round_cents,
};

/// How long a quote stays valid.
pub const QUOTE_VALIDITY_DAYS: i64 = 30;

/// Label used when no volume tier applies.
pub const NO_VOLUME_DISCOUNT: &str = "No volume discount";

/// Pricing failures. Each maps to a client error at the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Customer not found")]
    CustomerNotFound,
    #[error("Product not found")]
    ProductNotFound,
    #[error("Category not found")]
    CategoryNotFound,
    #[error("Quantity must be at least 1")]
    ZeroQuantity,
}

/// Raw margin percentage: `(price - cost) / price * 100`.
///
/// A zero price yields zero instead of dividing by zero.
#[must_use]
pub fn margin(price: Decimal, cost: Decimal) -> Decimal {
    if price.is_zero() {
        return Decimal::ZERO;
    }
    (price - cost) / price * Decimal::ONE_HUNDRED
}

/// Margin formatted as `58.7%`.
#[must_use]
pub fn margin_percent(price: Decimal, cost: Decimal) -> String {
    format_percent(margin(price, cost))
}

/// Combined discount for one purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountBreakdown {
    pub volume_percent: u32,
    pub volume_label: String,
    pub tier_percent: u32,
    pub total_percent: u32,
}

impl DiscountBreakdown {
    /// Discount amount on `subtotal`, rounded to cents.
    #[must_use]
    pub fn amount_on(&self, subtotal: Decimal) -> Decimal {
        round_cents(subtotal * Decimal::from(self.total_percent) / Decimal::ONE_HUNDRED)
    }
}

/// Volume discount for `quantity` plus the tier discount for `tier`.
#[must_use]
pub fn discount_for(
    discounts: &DiscountTiers,
    tier: Option<CustomerTier>,
    quantity: u32,
) -> DiscountBreakdown {
    let (volume_percent, volume_label) = discounts
        .volume_tier(quantity)
        .map_or((0, NO_VOLUME_DISCOUNT.to_string()), |t| {
            (t.discount, t.label.clone())
        });
    let tier_percent = tier.map_or(0, |t| discounts.tier_percent(t));

    DiscountBreakdown {
        volume_percent,
        volume_label,
        tier_percent,
        total_percent: volume_percent + tier_percent,
    }
}

fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// One requested quote line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub product_id: ProductId,
    pub qty: u32,
}

/// A priced quote line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountReason {
    pub percent: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteDiscounts {
    pub quantity: DiscountReason,
    pub tier: DiscountReason,
    pub total: u32,
}

/// A customer quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_tier: CustomerTier,
    pub items: Vec<QuoteLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub discounts: QuoteDiscounts,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(serialize_with = "serialize_millis")]
    pub valid_until: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

/// Price a quote for a customer.
///
/// Lines naming unknown products are dropped. The volume tier is chosen
/// from the total quantity across the remaining lines.
///
/// # Errors
///
/// Returns `PricingError::CustomerNotFound` for an unknown customer.
pub fn quote(
    catalog: &Catalog,
    customer_id: &str,
    items: &[QuoteItem],
    now: DateTime<Utc>,
) -> Result<Quote, PricingError> {
    let customer = catalog
        .customer(customer_id)
        .ok_or(PricingError::CustomerNotFound)?;

    let lines: Vec<QuoteLine> = items
        .iter()
        .filter_map(|item| {
            let product = catalog.product(item.product_id.as_str())?;
            Some(QuoteLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity: item.qty,
                unit_price: product.price,
                line_total: product.price * Decimal::from(item.qty),
            })
        })
        .collect();

    let subtotal: Decimal = lines.iter().map(|line| line.line_total).sum();
    let total_qty = lines
        .iter()
        .fold(0u32, |acc, line| acc.saturating_add(line.quantity));

    let breakdown = discount_for(&catalog.discounts, Some(customer.tier), total_qty);
    let discount_amount = breakdown.amount_on(subtotal);

    Ok(Quote {
        id: QuoteId::new(format!("QT-{}", now.timestamp_millis())),
        customer_id: customer.id.clone(),
        customer_name: customer.name.clone(),
        customer_tier: customer.tier,
        items: lines,
        subtotal,
        discounts: QuoteDiscounts {
            quantity: DiscountReason {
                percent: breakdown.volume_percent,
                reason: format!("{total_qty}+ units"),
            },
            tier: DiscountReason {
                percent: breakdown.tier_percent,
                reason: format!("{} customer", customer.tier),
            },
            total: breakdown.total_percent,
        },
        discount_amount,
        total: subtotal - discount_amount,
        valid_until: now + Duration::days(QUOTE_VALIDITY_DAYS),
        created_at: now,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountLabel {
    pub percent: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDiscounts {
    pub volume: DiscountLabel,
    pub tier: DiscountLabel,
}

/// Bulk price for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPrice {
    pub product: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub discounts: BulkDiscounts,
    pub total_discount: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_total: Decimal,
    pub final_unit_price: String,
}

/// Price `quantity` units of a product for an optional customer tier.
///
/// The tier name is matched case-insensitively; an unknown name earns no
/// tier discount but is still echoed as the label.
///
/// # Errors
///
/// Returns `ProductNotFound` for an unknown product and `ZeroQuantity`
/// when `quantity` is zero.
pub fn bulk_price(
    catalog: &Catalog,
    product_id: &str,
    quantity: u32,
    customer_tier: Option<&str>,
) -> Result<BulkPrice, PricingError> {
    let product = catalog
        .product(product_id)
        .ok_or(PricingError::ProductNotFound)?;
    if quantity == 0 {
        return Err(PricingError::ZeroQuantity);
    }

    let tier_name = customer_tier.map(str::trim).filter(|t| !t.is_empty());
    let tier = tier_name.and_then(CustomerTier::parse_loose);
    let breakdown = discount_for(&catalog.discounts, tier, quantity);

    let subtotal = product.price * Decimal::from(quantity);
    let discount_amount = breakdown.amount_on(subtotal);
    let final_total = subtotal - discount_amount;
    let unit = (final_total / Decimal::from(quantity))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(BulkPrice {
        product: product.name.clone(),
        quantity,
        base_price: product.price,
        subtotal,
        discounts: BulkDiscounts {
            volume: DiscountLabel {
                percent: breakdown.volume_percent,
                label: breakdown.volume_label,
            },
            tier: DiscountLabel {
                percent: breakdown.tier_percent,
                label: tier_name.unwrap_or("None").to_string(),
            },
        },
        total_discount: format!("{}%", breakdown.total_percent),
        discount_amount,
        final_total,
        final_unit_price: format!("{unit:.2}"),
    })
}

/// Price and margin sheet for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSheet<'a> {
    pub product_id: &'a ProductId,
    pub name: &'a str,
    pub category: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub margin: String,
    pub currency: &'static str,
    pub volume_discounts: &'a [VolumeTier],
    pub tier_discounts: &'a BTreeMap<CustomerTier, u32>,
}

/// Build the price sheet for a product.
///
/// # Errors
///
/// Returns `PricingError::ProductNotFound` for an unknown product.
pub fn price_sheet<'a>(
    catalog: &'a Catalog,
    product_id: &str,
) -> Result<PriceSheet<'a>, PricingError> {
    let product = catalog
        .product(product_id)
        .ok_or(PricingError::ProductNotFound)?;

    Ok(PriceSheet {
        product_id: &product.id,
        name: &product.name,
        category: &product.category,
        base_price: product.price,
        cost: product.cost,
        margin: margin_percent(product.price, product.cost),
        currency: CURRENCY,
        volume_discounts: &catalog.discounts.quantity,
        tier_discounts: &catalog.discounts.customer,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductMargin<'a> {
    pub id: &'a ProductId,
    pub name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub margin: String,
}

/// Margins across one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPricing<'a> {
    /// The category name exactly as requested.
    pub category: String,
    pub products: Vec<ProductMargin<'a>>,
    pub average_margin: String,
    pub count: usize,
}

/// Per-product margins and the average margin of a category.
///
/// # Errors
///
/// Returns `PricingError::CategoryNotFound` when no product matches.
pub fn category_pricing<'a>(
    catalog: &'a Catalog,
    category: &str,
) -> Result<CategoryPricing<'a>, PricingError> {
    let products: Vec<_> = catalog.products_in_category(category).collect();
    if products.is_empty() {
        return Err(PricingError::CategoryNotFound);
    }

    let total: Decimal = products.iter().map(|p| margin(p.price, p.cost)).sum();
    let average = total / Decimal::from(products.len());

    Ok(CategoryPricing {
        category: category.to_string(),
        count: products.len(),
        products: products
            .into_iter()
            .map(|p| ProductMargin {
                id: &p.id,
                name: &p.name,
                price: p.price,
                cost: p.cost,
                margin: margin_percent(p.price, p.cost),
            })
            .collect(),
        average_margin: format_percent(average),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 15, 9, 30, 0).unwrap()
    }

    fn item(product: &str, qty: u32) -> QuoteItem {
        QuoteItem {
            product_id: ProductId::new(product),
            qty,
        }
    }

    #[test]
    fn test_margin_percent() {
        assert_eq!(
            margin_percent(Decimal::new(14999, 2), Decimal::from(62)),
            "58.7%"
        );
        assert_eq!(margin_percent(Decimal::from(100), Decimal::from(40)), "60.0%");
        assert_eq!(margin_percent(Decimal::ZERO, Decimal::from(5)), "0.0%");
    }

    #[test]
    fn test_discount_for_boundaries() {
        let discounts = catalog().discounts;

        let none = discount_for(&discounts, None, 9);
        assert_eq!(none.total_percent, 0);
        assert_eq!(none.volume_label, NO_VOLUME_DISCOUNT);

        let gold = discount_for(&discounts, Some(CustomerTier::Gold), 100);
        assert_eq!(gold.volume_percent, 15);
        assert_eq!(gold.tier_percent, 3);
        assert_eq!(gold.total_percent, 18);
        assert_eq!(gold.volume_label, "100+ units");

        let silver = discount_for(&discounts, Some(CustomerTier::Silver), 499);
        assert_eq!(silver.total_percent, 15);
    }

    #[test]
    fn test_quote_with_top_volume_tier() {
        let quote = quote(&catalog(), "CUST-001", &[item("BB-PRO-001", 600)], fixed_now()).unwrap();

        assert_eq!(quote.subtotal, Decimal::new(89_994_00, 2));
        assert_eq!(quote.discounts.quantity.percent, 20);
        assert_eq!(quote.discounts.quantity.reason, "600+ units");
        assert_eq!(quote.discounts.tier.percent, 5);
        assert_eq!(quote.discounts.tier.reason, "Platinum customer");
        assert_eq!(quote.discounts.total, 25);
        assert_eq!(quote.discount_amount, Decimal::new(22_498_50, 2));
        assert_eq!(quote.total, Decimal::new(67_495_50, 2));
    }

    #[test]
    fn test_quote_uses_total_quantity_across_lines() {
        let quote = quote(
            &catalog(),
            "CUST-007",
            &[item("UNI-JRS-001", 30), item("UNI-SHT-001", 30)],
            fixed_now(),
        )
        .unwrap();

        assert_eq!(quote.discounts.quantity.percent, 10);
        assert_eq!(quote.discounts.quantity.reason, "60+ units");
        assert_eq!(quote.discounts.tier.percent, 0);
    }

    #[test]
    fn test_quote_skips_unknown_products() {
        let quote = quote(
            &catalog(),
            "CUST-004",
            &[item("NOPE-001", 1000), item("TRN-CON-001", 2)],
            fixed_now(),
        )
        .unwrap();

        assert_eq!(quote.items.len(), 1);
        assert_eq!(quote.subtotal, Decimal::new(5998, 2));
        assert_eq!(quote.discounts.quantity.percent, 0);
        assert_eq!(quote.discounts.tier.percent, 3);
    }

    #[test]
    fn test_quote_unknown_customer() {
        assert_eq!(
            quote(&catalog(), "CUST-999", &[item("BB-PRO-001", 1)], fixed_now()),
            Err(PricingError::CustomerNotFound)
        );
    }

    #[test]
    fn test_quote_serializes_ids_and_timestamps() {
        let now = fixed_now();
        let quote = quote(&catalog(), "CUST-001", &[], now).unwrap();
        let value = serde_json::to_value(&quote).unwrap();

        assert_eq!(value["id"], format!("QT-{}", now.timestamp_millis()));
        assert_eq!(value["createdAt"], "2024-12-15T09:30:00.000Z");
        assert_eq!(value["validUntil"], "2025-01-14T09:30:00.000Z");
        assert_eq!(value["customerTier"], "Platinum");
        assert_eq!(value["discounts"]["quantity"]["reason"], "0+ units");
    }

    #[test]
    fn test_bulk_price_gold_hundred() {
        let bulk = bulk_price(&catalog(), "BB-PRO-001", 100, Some("Gold")).unwrap();

        assert_eq!(bulk.subtotal, Decimal::new(14_999_00, 2));
        assert_eq!(bulk.total_discount, "18%");
        assert_eq!(bulk.discount_amount, Decimal::new(2_699_82, 2));
        assert_eq!(bulk.final_total, Decimal::new(12_299_18, 2));
        assert_eq!(bulk.final_unit_price, "122.99");
        assert_eq!(bulk.discounts.volume.label, "100+ units");
        assert_eq!(bulk.discounts.tier.label, "Gold");
    }

    #[test]
    fn test_bulk_price_without_tier() {
        let bulk = bulk_price(&catalog(), "TRN-DRB-001", 3, None).unwrap();
        assert_eq!(bulk.total_discount, "0%");
        assert_eq!(bulk.discounts.tier.label, "None");
        assert_eq!(bulk.discounts.volume.label, NO_VOLUME_DISCOUNT);
        assert_eq!(bulk.final_unit_price, "19.99");

        let blank = bulk_price(&catalog(), "TRN-DRB-001", 3, Some("")).unwrap();
        assert_eq!(blank.discounts.tier.label, "None");
    }

    #[test]
    fn test_bulk_price_unknown_tier_echoed_without_discount() {
        let bulk = bulk_price(&catalog(), "BB-PRO-001", 1, Some("Diamond")).unwrap();
        assert_eq!(bulk.discounts.tier.percent, 0);
        assert_eq!(bulk.discounts.tier.label, "Diamond");
    }

    #[test]
    fn test_bulk_price_errors() {
        let catalog = catalog();
        assert_eq!(
            bulk_price(&catalog, "NOPE", 10, None),
            Err(PricingError::ProductNotFound)
        );
        assert_eq!(
            bulk_price(&catalog, "BB-PRO-001", 0, None),
            Err(PricingError::ZeroQuantity)
        );
    }

    #[test]
    fn test_price_sheet() {
        let catalog = catalog();
        let sheet = price_sheet(&catalog, "HP-PRO-001").unwrap();
        assert_eq!(sheet.margin, "58.0%");
        assert_eq!(sheet.currency, "USD");
        assert_eq!(sheet.volume_discounts.len(), 4);

        let value = serde_json::to_value(&sheet).unwrap();
        assert_eq!(value["tierDiscounts"]["Platinum"], 5);
        assert_eq!(value["productId"], "HP-PRO-001");
    }

    #[test]
    fn test_category_pricing() {
        let catalog = catalog();
        let pricing = category_pricing(&catalog, "training").unwrap();
        assert_eq!(pricing.category, "training");
        assert_eq!(pricing.count, 4);
        assert_eq!(pricing.products[0].margin, "70.0%");

        assert_eq!(
            category_pricing(&catalog, "Skates"),
            Err(PricingError::CategoryNotFound)
        );
    }

    #[test]
    fn test_category_pricing_outlives_category_name() {
        let catalog = catalog();
        let pricing = {
            let requested = String::from("Court Equipment");
            category_pricing(&catalog, &requested).unwrap()
        };
        assert_eq!(pricing.category, "Court Equipment");
        assert_eq!(pricing.count, 3);
    }
}
