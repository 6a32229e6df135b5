//! Pricing tools: price sheets, category margins and bulk pricing.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use progear_core::{PricingError, ToolScope, pricing};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::Caller;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Body of `POST /mcp/tools/calculate_bulk_price`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPriceRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: u32,
    pub customer_tier: Option<String>,
}

/// `GET /mcp/tools/get_price/{product_id}`
pub async fn get_price(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::PricingRead)?;

    let sheet = pricing::price_sheet(state.catalog(), &product_id)
        .map_err(|e: PricingError| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({
        "tool": "get_price",
        "result": serde_json::to_value(&sheet)?,
    })))
}

/// `GET /mcp/tools/category_pricing/{category}`
///
/// The category is matched case-insensitively and echoed as given.
pub async fn category_pricing(
    State(state): State<AppState>,
    caller: Caller,
    Path(category): Path<String>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::PricingRead)?;

    let summary = pricing::category_pricing(state.catalog(), &category)
        .map_err(|e: PricingError| AppError::NotFound(e.to_string()))?;

    let mut body = serde_json::to_value(&summary)?;
    body["tool"] = json!("category_pricing");
    Ok(Json(body))
}

/// `POST /mcp/tools/calculate_bulk_price`
pub async fn calculate_bulk_price(
    State(state): State<AppState>,
    caller: Caller,
    payload: std::result::Result<Json<BulkPriceRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::PricingRead)?;
    let Json(request) = payload?;

    let bulk = pricing::bulk_price(
        state.catalog(),
        &request.product_id,
        request.quantity,
        request.customer_tier.as_deref(),
    )
    .map_err(|e: PricingError| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "tool": "calculate_bulk_price",
        "result": serde_json::to_value(&bulk)?,
    })))
}
