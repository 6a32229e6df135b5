//! Customer tools: lookup, search and purchase history.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use progear_core::ToolScope;
use serde::Deserialize;
use serde_json::{Value, json};

use super::non_empty;
use crate::auth::Caller;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerSearchQuery {
    pub q: Option<String>,
    pub tier: Option<String>,
}

fn customer_not_found() -> AppError {
    AppError::NotFound("Customer not found".to_string())
}

/// `GET /mcp/tools/get_customer/{customer_id}`
pub async fn get_customer(
    State(state): State<AppState>,
    caller: Caller,
    Path(customer_id): Path<String>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::CustomerRead)?;

    let customer = state
        .catalog()
        .customer(&customer_id)
        .ok_or_else(customer_not_found)?;

    Ok(Json(json!({
        "tool": "get_customer",
        "result": serde_json::to_value(customer)?,
    })))
}

/// `GET /mcp/tools/search_customers?q=&tier=`
pub async fn search_customers(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<CustomerSearchQuery>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::CustomerRead)?;

    let needle = non_empty(query.q).unwrap_or_default().to_lowercase();
    let tier = non_empty(query.tier);
    let matches = state
        .catalog()
        .search_customers(Some(&needle), tier.as_deref());

    let mut body = json!({
        "tool": "search_customers",
        "query": needle,
        "count": matches.len(),
        "result": serde_json::to_value(&matches)?,
    });
    if let Some(tier) = tier {
        body["tier"] = Value::String(tier);
    }
    Ok(Json(body))
}

/// `GET /mcp/tools/customer_history/{customer_id}`
pub async fn customer_history(
    State(state): State<AppState>,
    caller: Caller,
    Path(customer_id): Path<String>,
) -> Result<Json<Value>> {
    state.authorize(&caller, ToolScope::CustomerRead)?;
    let catalog = state.catalog();

    let customer = catalog
        .customer(&customer_id)
        .ok_or_else(customer_not_found)?;
    let orders: Vec<_> = catalog.orders_for(customer.id.as_str()).collect();

    Ok(Json(json!({
        "tool": "customer_history",
        "customer": {
            "id": customer.id.as_str(),
            "name": customer.name,
            "tier": customer.tier.as_str(),
            "lifetimeValue": customer.lifetime_value,
        },
        "totalOrders": orders.len(),
        "orders": serde_json::to_value(&orders)?,
    })))
}
