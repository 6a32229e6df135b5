//! Health check.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    products: usize,
    customers: usize,
}

/// Liveness probe; reports the size of the loaded catalog.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let catalog = state.catalog();
    Json(HealthResponse {
        status: "healthy",
        service: "progear-mcp-server",
        products: catalog.products.len(),
        customers: catalog.customers.len(),
    })
}
