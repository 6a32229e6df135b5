//! Sales catalog: products, customers, orders and discount tables.
//!
//! The catalog is configuration data. It is loaded once at startup (the
//! bundled data set or a YAML file named by the operator) and is read-only
//! afterwards, so servers share it behind an `Arc` without locking.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CustomerId, CustomerTier, Email, OrderId, OrderStatus, ProductId};

/// The bundled ProGear basketball data set.
const BUILTIN_CATALOG: &str = include_str!("../data/catalog.yaml");

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("catalog has {} problem(s): {}", .0.len(), .0.join("; "))]
    Invalid(Vec<String>),
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub stock: u32,
    pub reorder_point: u32,
    pub supplier: String,
}

/// A customer account (school, team or organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub tier: CustomerTier,
    pub territory: String,
    pub contact: String,
    pub email: Email,
    pub phone: String,
    pub total_orders: u32,
    pub lifetime_value: u64,
    pub last_order: NaiveDate,
    pub payment_terms: String,
}

/// One line of a historical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub qty: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// A historical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Customer display name at the time of the order.
    pub customer: String,
    pub items: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub ship_date: Option<NaiveDate>,
}

/// A volume discount tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTier {
    pub min_qty: u32,
    /// Discount percentage.
    pub discount: u32,
    pub label: String,
}

/// Volume and customer-tier discount tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTiers {
    /// Volume tiers in ascending `min_qty` order.
    pub quantity: Vec<VolumeTier>,
    /// Percentage per customer tier, serialized highest tier first.
    pub customer: BTreeMap<CustomerTier, u32>,
}

impl DiscountTiers {
    /// Discount percentage for a customer tier (0 when the tier has no entry).
    #[must_use]
    pub fn tier_percent(&self, tier: CustomerTier) -> u32 {
        self.customer.get(&tier).copied().unwrap_or(0)
    }

    /// The highest volume tier reached by `quantity`, if any.
    #[must_use]
    pub fn volume_tier(&self, quantity: u32) -> Option<&VolumeTier> {
        self.quantity
            .iter()
            .filter(|tier| quantity >= tier.min_qty)
            .max_by_key(|tier| tier.min_qty)
    }
}

/// The complete read-only sales data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    pub orders: Vec<Order>,
    pub discounts: DiscountTiers,
}

impl Catalog {
    /// Load the bundled ProGear data set.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled file is malformed, which the
    /// unit tests rule out.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed YAML and
    /// `CatalogError::Invalid` when [`Catalog::validate`] finds problems.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_yaml::from_str(yaml)?;
        let problems = catalog.validate();
        if problems.is_empty() {
            Ok(catalog)
        } else {
            Err(CatalogError::Invalid(problems))
        }
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check referential integrity and pricing sanity.
    ///
    /// Returns a human-readable list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut product_ids = HashSet::new();
        for product in &self.products {
            if !product_ids.insert(product.id.as_str()) {
                problems.push(format!("duplicate product id {}", product.id));
            }
            if product.price <= Decimal::ZERO {
                problems.push(format!("product {} has a non-positive price", product.id));
            }
            if product.cost > product.price {
                problems.push(format!("product {} costs more than its price", product.id));
            }
        }

        let mut customer_ids = HashSet::new();
        for customer in &self.customers {
            if !customer_ids.insert(customer.id.as_str()) {
                problems.push(format!("duplicate customer id {}", customer.id));
            }
        }

        let mut order_ids = HashSet::new();
        for order in &self.orders {
            if !order_ids.insert(order.id.as_str()) {
                problems.push(format!("duplicate order id {}", order.id));
            }
            if !customer_ids.contains(order.customer_id.as_str()) {
                problems.push(format!(
                    "order {} references unknown customer {}",
                    order.id, order.customer_id
                ));
            }
            for line in &order.items {
                if !product_ids.contains(line.product_id.as_str()) {
                    problems.push(format!(
                        "order {} references unknown product {}",
                        order.id, line.product_id
                    ));
                }
            }
            if order.ship_date.is_some_and(|shipped| shipped < order.order_date) {
                problems.push(format!("order {} ships before it was placed", order.id));
            }
        }

        let tiers = &self.discounts.quantity;
        if tiers.windows(2).any(|pair| match pair {
            [a, b] => a.min_qty >= b.min_qty,
            _ => false,
        }) {
            problems.push("volume tiers must be strictly ascending by minQty".to_string());
        }
        if tiers.iter().any(|tier| tier.discount > 100) {
            problems.push("volume discount above 100%".to_string());
        }
        if self.discounts.customer.values().any(|pct| *pct > 100) {
            problems.push("tier discount above 100%".to_string());
        }

        problems
    }

    /// Find a product by its exact id.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == *id)
    }

    /// Find a customer by its exact id.
    #[must_use]
    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == *id)
    }

    /// Orders placed by a customer, in catalog order.
    pub fn orders_for<'a>(&'a self, customer_id: &'a str) -> impl Iterator<Item = &'a Order> {
        self.orders.iter().filter(move |o| o.customer_id == *customer_id)
    }

    /// Orders with an exact status name (`shipped`, `pending`, ...).
    ///
    /// `None` returns every order.
    pub fn orders_with_status<'a>(
        &'a self,
        status: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Order> {
        self.orders
            .iter()
            .filter(move |o| status.is_none_or(|s| o.status.as_str() == s))
    }

    /// Products in a category, compared case-insensitively.
    pub fn products_in_category<'a>(
        &'a self,
        category: &str,
    ) -> impl Iterator<Item = &'a Product> + use<'a> {
        let category = category.to_owned();
        self.products
            .iter()
            .filter(move |p| p.category.eq_ignore_ascii_case(&category))
    }

    /// Products whose name, category or subcategory contains `query`
    /// (case-insensitive). An empty query matches every product.
    pub fn search_products<'a>(
        &'a self,
        query: &str,
    ) -> impl Iterator<Item = &'a Product> + use<'a> {
        let needle = query.to_lowercase();
        self.products.iter().filter(move |p| {
            p.name.to_lowercase().contains(&needle)
                || p.category.to_lowercase().contains(&needle)
                || p.subcategory.to_lowercase().contains(&needle)
        })
    }

    /// Customers matching a free-text query and/or a tier.
    ///
    /// The query is matched case-insensitively against name, contact and
    /// territory; the tier name is compared case-insensitively. Empty
    /// filters are ignored.
    #[must_use]
    pub fn search_customers(&self, query: Option<&str>, tier: Option<&str>) -> Vec<&Customer> {
        let needle = query.map(str::to_lowercase).filter(|q| !q.is_empty());
        self.customers
            .iter()
            .filter(|c| {
                needle.as_ref().is_none_or(|q| {
                    c.name.to_lowercase().contains(q)
                        || c.contact.to_lowercase().contains(q)
                        || c.territory.to_lowercase().contains(q)
                })
            })
            .filter(|c| {
                tier.filter(|t| !t.is_empty())
                    .is_none_or(|t| c.tier.as_str().eq_ignore_ascii_case(t))
            })
            .collect()
    }

    /// Distinct category names in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.products
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }
}
