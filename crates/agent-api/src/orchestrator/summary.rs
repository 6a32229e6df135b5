//! Render tool results as short chat text.

use std::fmt::Write as _;

use serde_json::Value;

/// Rows listed before the remainder is collapsed into a count.
const MAX_LISTED: usize = 5;

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn money(value: &Value) -> String {
    value
        .as_f64()
        .map_or_else(|| text(value), |amount| format!("${amount:.2}"))
}

fn listing(out: &mut String, rows: &[Value], line: impl Fn(&Value) -> String) {
    for row in rows.iter().take(MAX_LISTED) {
        let _ = write!(out, "\n- {}", line(row));
    }
    if rows.len() > MAX_LISTED {
        let _ = write!(out, "\n- ...and {} more", rows.len() - MAX_LISTED);
    }
}

fn rows(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Summarize the response of `tool`.
#[must_use]
pub fn summarize(tool: &str, body: &Value) -> String {
    let result = &body["result"];
    let mut out = String::new();

    match tool {
        "list_products" | "search_inventory" => {
            let _ = write!(out, "{} products found.", text(&body["count"]));
            listing(&mut out, rows(result), |p| {
                format!(
                    "{} ({}): {}, {} in stock",
                    text(&p["name"]),
                    text(&p["id"]),
                    money(&p["price"]),
                    text(&p["stock"])
                )
            });
        }
        "check_stock" => {
            let _ = write!(
                out,
                "{} ({}): {} units on hand, stock is {} (reorder point {}). Supplier: {}.",
                text(&result["name"]),
                text(&result["productId"]),
                text(&result["stock"]),
                text(&result["stockStatus"]),
                text(&result["reorderPoint"]),
                text(&result["supplier"])
            );
        }
        "get_customer" => {
            let _ = write!(
                out,
                "{} ({}), {} tier, {} territory. Contact: {}.",
                text(&result["name"]),
                text(&result["id"]),
                text(&result["tier"]),
                text(&result["territory"]),
                text(&result["contact"])
            );
        }
        "search_customers" => {
            let _ = write!(out, "{} customers found.", text(&body["count"]));
            listing(&mut out, rows(result), |c| {
                format!(
                    "{} ({}): {}, {}",
                    text(&c["name"]),
                    text(&c["id"]),
                    text(&c["tier"]),
                    text(&c["territory"])
                )
            });
        }
        "customer_history" => {
            let customer = &body["customer"];
            let _ = write!(
                out,
                "{} ({} tier), lifetime value {}: {} orders on file.",
                text(&customer["name"]),
                text(&customer["tier"]),
                money(&customer["lifetimeValue"]),
                text(&body["totalOrders"])
            );
            listing(&mut out, rows(&body["orders"]), order_line);
        }
        "get_orders" => {
            let _ = write!(out, "{} orders found.", text(&body["count"]));
            listing(&mut out, rows(result), |o| {
                format!("{} for {}", order_line(o), text(&o["customer"]))
            });
        }
        "create_quote" => {
            let _ = write!(
                out,
                "Quote {} for {}: subtotal {}, {}% discount ({}), total {}. Valid until {}.",
                text(&result["id"]),
                text(&result["customerName"]),
                money(&result["subtotal"]),
                text(&result["discounts"]["total"]),
                money(&result["discountAmount"]),
                money(&result["total"]),
                text(&result["validUntil"])
            );
        }
        "get_price" => {
            let _ = write!(
                out,
                "{} ({}): {} list, cost {}, margin {}.",
                text(&result["name"]),
                text(&result["productId"]),
                money(&result["basePrice"]),
                money(&result["cost"]),
                text(&result["margin"])
            );
        }
        "category_pricing" => {
            let _ = write!(
                out,
                "{}: {} products, average margin {}.",
                text(&body["category"]),
                text(&body["count"]),
                text(&body["averageMargin"])
            );
            listing(&mut out, rows(&body["products"]), |p| {
                format!(
                    "{}: {} (margin {})",
                    text(&p["name"]),
                    money(&p["price"]),
                    text(&p["margin"])
                )
            });
        }
        "calculate_bulk_price" => {
            let _ = write!(
                out,
                "{} x {}: subtotal {}, {} off, final {} ({} each).",
                text(&result["quantity"]),
                text(&result["product"]),
                money(&result["subtotal"]),
                text(&result["totalDiscount"]),
                money(&result["finalTotal"]),
                text(&result["finalUnitPrice"])
            );
        }
        _ => out = body.to_string(),
    }

    out
}

fn order_line(order: &Value) -> String {
    format!(
        "{}: {} ({})",
        text(&order["id"]),
        money(&order["total"]),
        text(&order["status"])
    )
}
