//! HTTP route handlers for the tool server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                             - Health check (public)
//!
//! # Inventory (inventory:read)
//! GET  /mcp/tools/list_products            - Product summaries, ?category=
//! GET  /mcp/tools/check_stock/{id}         - Stock detail for one product
//! GET  /mcp/tools/search_inventory         - Free-text product search, ?q=
//!
//! # Customers (customer:read)
//! GET  /mcp/tools/get_customer/{id}        - Full customer record
//! GET  /mcp/tools/search_customers         - ?q= and/or ?tier=
//! GET  /mcp/tools/customer_history/{id}    - Customer summary with orders
//!
//! # Sales (sales:read, sales:quote)
//! GET  /mcp/tools/get_orders               - Orders, ?status=
//! POST /mcp/tools/create_quote             - Price a multi-line quote
//!
//! # Pricing (pricing:read)
//! GET  /mcp/tools/get_price/{id}           - Price sheet with discount tables
//! GET  /mcp/tools/category_pricing/{cat}   - Margins across a category
//! POST /mcp/tools/calculate_bulk_price     - Single-product volume pricing
//! ```
//!
//! Every tool response carries `"tool": "<name>"`. Empty query parameters
//! behave as if they were absent.

pub mod customers;
pub mod health;
pub mod inventory;
pub mod pricing;
pub mod sales;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the tool routes router, mounted under `/mcp/tools`.
pub fn tool_routes() -> Router<AppState> {
    Router::new()
        // Inventory
        .route("/list_products", get(inventory::list_products))
        .route("/check_stock/{product_id}", get(inventory::check_stock))
        .route("/search_inventory", get(inventory::search_inventory))
        // Customers
        .route("/get_customer/{customer_id}", get(customers::get_customer))
        .route("/search_customers", get(customers::search_customers))
        .route(
            "/customer_history/{customer_id}",
            get(customers::customer_history),
        )
        // Sales
        .route("/get_orders", get(sales::get_orders))
        .route("/create_quote", post(sales::create_quote))
        // Pricing
        .route("/get_price/{product_id}", get(pricing::get_price))
        .route("/category_pricing/{category}", get(pricing::category_pricing))
        .route("/calculate_bulk_price", post(pricing::calculate_bulk_price))
}

/// Treat a blank query parameter as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use jsonwebtoken::Algorithm;

    use super::testing::{app_with, get, send};
    use crate::auth::TokenGuard;
    use crate::auth::verifier::tests::{sign, test_verifier, valid_claims};
    use crate::config::{AuthConfig, McpServerConfig};

    fn production_config(enforce_scopes: bool) -> McpServerConfig {
        McpServerConfig {
            auth: AuthConfig {
                issuer: None,
                audience: None,
                algorithms: vec![Algorithm::HS256],
                jwks_cache_ttl: std::time::Duration::from_secs(300),
                enforce_scopes,
            },
            ..McpServerConfig::default()
        }
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(super::non_empty(Some("  ".to_string())), None);
        assert_eq!(super::non_empty(None), None);
        assert_eq!(
            super::non_empty(Some("Footballs".to_string())).as_deref(),
            Some("Footballs")
        );
    }

    #[tokio::test]
    async fn test_tools_require_token_in_production() {
        let app = app_with(
            production_config(false),
            TokenGuard::new(Some(test_verifier(None)), false),
        );
        let (status, body) = send(app, Method::GET, "/mcp/tools/list_products", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing authorization header");
    }

    #[tokio::test]
    async fn test_health_is_public_in_production() {
        let app = app_with(
            production_config(false),
            TokenGuard::new(Some(test_verifier(None)), false),
        );
        let (status, body) = send(app, Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_demo_token_reaches_tools() {
        let app = app_with(
            production_config(true),
            TokenGuard::new(Some(test_verifier(None)), false),
        );
        let (status, body) = send(
            app,
            Method::GET,
            "/mcp/tools/get_customer/CUST-001",
            Some("Bearer demo-customer-0f3c"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tool"], "get_customer");
    }

    #[tokio::test]
    async fn test_enforced_scope_rejects_verified_token() {
        let app = app_with(
            production_config(true),
            TokenGuard::new(Some(test_verifier(None)), false),
        );
        let header = format!("Bearer {}", sign(&valid_claims(&["inventory:read"])));

        let (status, body) = send(
            app.clone(),
            Method::GET,
            "/mcp/tools/get_price/BB-PRO-001",
            Some(&header),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Insufficient scope: pricing:read");

        let (status, _) = send(
            app,
            Method::GET,
            "/mcp/tools/check_stock/BB-PRO-001",
            Some(&header),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let (status, _) = get("/mcp/tools/delete_everything").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
