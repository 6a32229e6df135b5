//! Inventory tools: product listing, stock checks and search.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use progear_core::{Product, ProductId, StockStatus, ToolScope};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::non_empty;
use crate::auth::Caller;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Row returned by `list_products`.
#[derive(Debug, Serialize)]
struct ProductSummary<'a> {
    id: &'a ProductId,
    name: &'a str,
    category: &'a str,
    subcategory: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    stock: u32,
}

impl<'a> From<&'a Product> for ProductSummary<'a> {
    fn from(p: &'a Product) -> Self {
        Self {
            id: &p.id,
            name: &p.name,
            category: &p.category,
            subcategory: &p.subcategory,
            price: p.price,
            stock: p.stock,
        }
    }
}

/// Row returned by `search_inventory`.
#[derive(Debug, Serialize)]
struct InventoryHit<'a> {
    id: &'a ProductId,
    name: &'a str,
    category: &'a str,
    stock: u32,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockLevel<'a> {
    product_id: &'a ProductId,
    name: &'a str,
    category: &'a str,
    stock: u32,
    reorder_point: u32,
    stock_status: StockStatus,
    supplier: &'a str,
    available: bool,
}

/// `GET /mcp/tools/list_products?category=`
pub async fn list_products(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::InventoryRead)?;
    let catalog = state.catalog();

    let category = non_empty(query.category);
    let rows: Vec<ProductSummary<'_>> = match category.as_deref() {
        Some(category) => catalog
            .products_in_category(category)
            .map(ProductSummary::from)
            .collect(),
        None => catalog.products.iter().map(ProductSummary::from).collect(),
    };

    Ok(Json(json!({
        "tool": "list_products",
        "count": rows.len(),
        "result": serde_json::to_value(&rows)?,
    })))
}

/// `GET /mcp/tools/check_stock/{product_id}`
pub async fn check_stock(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::InventoryRead)?;

    let product = state
        .catalog()
        .product(&product_id)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let level = StockLevel {
        product_id: &product.id,
        name: &product.name,
        category: &product.category,
        stock: product.stock,
        reorder_point: product.reorder_point,
        stock_status: StockStatus::classify(product.stock, product.reorder_point),
        supplier: &product.supplier,
        available: product.stock > 0,
    };

    Ok(Json(json!({
        "tool": "check_stock",
        "result": serde_json::to_value(&level)?,
    })))
}

/// `GET /mcp/tools/search_inventory?q=`
///
/// A missing query matches every product.
pub async fn search_inventory(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::InventoryRead)?;

    let needle = non_empty(query.q).unwrap_or_default().to_lowercase();
    let hits: Vec<InventoryHit<'_>> = state
        .catalog()
        .search_products(&needle)
        .map(|p| InventoryHit {
            id: &p.id,
            name: &p.name,
            category: &p.category,
            stock: p.stock,
            price: p.price,
        })
        .collect();

    Ok(Json(json!({
        "tool": "search_inventory",
        "query": needle,
        "count": hits.len(),
        "result": serde_json::to_value(&hits)?,
    })))
}
