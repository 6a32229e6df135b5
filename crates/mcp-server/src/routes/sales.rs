//! Sales tools: order lookup and quote generation.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use progear_core::{PricingError, QuoteItem, ToolScope, pricing};
use serde::Deserialize;
use serde_json::{Value, json};

use super::non_empty;
use crate::auth::Caller;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

/// Body of `POST /mcp/tools/create_quote`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<QuoteItem>,
}

/// `GET /mcp/tools/get_orders?status=`
pub async fn get_orders(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::SalesRead)?;

    let status = non_empty(query.status);
    let orders: Vec<_> = state
        .catalog()
        .orders_with_status(status.as_deref())
        .collect();

    Ok(Json(json!({
        "tool": "get_orders",
        "count": orders.len(),
        "result": serde_json::to_value(&orders)?,
    })))
}

/// `POST /mcp/tools/create_quote`
///
/// Lines naming unknown products are left out of the quote.
pub async fn create_quote(
    State(state): State<AppState>,
    caller: Caller,
    payload: std::result::Result<Json<CreateQuoteRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::SalesQuote)?;
    let Json(request) = payload?;

    let quote = pricing::quote(state.catalog(), &request.customer_id, &request.items, Utc::now())
        .map_err(|e: PricingError| AppError::BadRequest(e.to_string()))?;

    tracing::info!(
        quote_id = %quote.id,
        customer_id = %quote.customer_id,
        total = %quote.total,
        "Quote created"
    );

    Ok(Json(json!({
        "tool": "create_quote",
        "result": serde_json::to_value(&quote)?,
    })))
}
