//! Pick the tool call an agent makes for a chat message.
//!
//! Planning is keyword based: ids, quantities, tiers, order statuses and
//! category names are lifted out of the message and mapped onto the agent's
//! tools.

use progear_core::{AgentKind, Catalog, CustomerTier, OrderStatus};
use serde_json::json;

use crate::mcp_client::ToolCall;

/// Vocabulary that is not derivable from the message alone.
#[derive(Debug, Clone, Default)]
pub struct RoutingHints {
    categories: Vec<String>,
}

impl RoutingHints {
    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            categories: catalog
                .categories()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// The first known category named in `lower` (already lower-cased).
    ///
    /// A trailing plural `s` is optional, so "basketball" finds
    /// "Basketballs".
    fn category_in(&self, lower: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| {
                let name = category.to_lowercase();
                let stem = name.strip_suffix('s').unwrap_or(&name);
                lower.contains(stem)
            })
            .map(String::as_str)
    }
}

/// Entities mentioned in a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mentions {
    pub product_ids: Vec<String>,
    pub customer_ids: Vec<String>,
    pub quantity: Option<u32>,
    pub tier: Option<CustomerTier>,
    pub status: Option<OrderStatus>,
    pub category: Option<String>,
    pub wants_quote: bool,
}

impl Mentions {
    #[must_use]
    pub fn extract(message: &str, hints: &RoutingHints) -> Self {
        let lower = message.to_lowercase();
        let mut mentions = Self {
            category: hints.category_in(&lower).map(str::to_string),
            wants_quote: lower.contains("quote"),
            ..Self::default()
        };

        for token in message
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .map(|t| t.trim_matches('-'))
            .filter(|t| !t.is_empty())
        {
            let upper = token.to_ascii_uppercase();
            if is_customer_id(&upper) {
                mentions.customer_ids.push(upper);
            } else if is_product_id(&upper) {
                mentions.product_ids.push(upper);
            } else if let Ok(qty) = token.parse::<u32>() {
                mentions.quantity = mentions.quantity.or(Some(qty));
            } else if let Some(tier) = CustomerTier::parse_loose(token) {
                mentions.tier = mentions.tier.or(Some(tier));
            } else if let Some(status) = OrderStatus::ALL
                .into_iter()
                .find(|s| s.as_str().eq_ignore_ascii_case(token))
            {
                mentions.status = mentions.status.or(Some(status));
            }
        }

        mentions
    }
}

/// `CUST-<digits>`
fn is_customer_id(token: &str) -> bool {
    token
        .strip_prefix("CUST-")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// `<LETTERS>-<LETTERS>-<digits>`, e.g. `BB-PRO-001`.
fn is_product_id(token: &str) -> bool {
    let parts: Vec<&str> = token.split('-').collect();
    matches!(
        parts.as_slice(),
        [family, line, number]
            if !family.is_empty()
                && family.bytes().all(|b| b.is_ascii_uppercase())
                && !line.is_empty()
                && line.bytes().all(|b| b.is_ascii_uppercase())
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit())
    )
}

/// The tool call `kind` makes for `mentions`, or `None` when the message
/// gives the agent nothing to look up.
#[must_use]
pub fn plan(kind: AgentKind, mentions: &Mentions) -> Option<ToolCall> {
    let product = mentions.product_ids.first();
    let customer = mentions.customer_ids.first();

    match kind {
        AgentKind::Sales => match customer {
            Some(customer) if mentions.wants_quote && !mentions.product_ids.is_empty() => {
                let qty = mentions.quantity.unwrap_or(1).max(1);
                let items: Vec<_> = mentions
                    .product_ids
                    .iter()
                    .map(|id| json!({ "productId": id, "qty": qty }))
                    .collect();
                ToolCall::post(
                    "create_quote",
                    &json!({ "customerId": customer, "items": items }),
                )
                .ok()
            }
            _ => Some(match mentions.status {
                Some(status) => ToolCall::get("get_orders").with_query("status", status.as_str()),
                None => ToolCall::get("get_orders"),
            }),
        },
        AgentKind::Inventory => Some(match (product, &mentions.category) {
            (Some(id), _) => ToolCall::get("check_stock").with_path(id),
            (None, Some(category)) => {
                ToolCall::get("list_products").with_query("category", category)
            }
            (None, None) => ToolCall::get("list_products"),
        }),
        AgentKind::Customer => Some(match (customer, mentions.tier) {
            (Some(id), _) => ToolCall::get("customer_history").with_path(id),
            (None, Some(tier)) => {
                ToolCall::get("search_customers").with_query("tier", tier.as_str())
            }
            (None, None) => ToolCall::get("search_customers"),
        }),
        AgentKind::Pricing => match (product, mentions.quantity, &mentions.category) {
            (Some(id), Some(quantity), _) => {
                let mut body = json!({ "productId": id, "quantity": quantity });
                if let Some(tier) = mentions.tier {
                    body["customerTier"] = json!(tier.as_str());
                }
                ToolCall::post("calculate_bulk_price", &body).ok()
            }
            (Some(id), None, _) => Some(ToolCall::get("get_price").with_path(id)),
            (None, _, Some(category)) => {
                Some(ToolCall::get("category_pricing").with_path(category))
            }
            (None, _, None) => None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hints() -> RoutingHints {
        RoutingHints::from_catalog(&Catalog::builtin().unwrap())
    }

    fn mentions(message: &str) -> Mentions {
        Mentions::extract(message, &hints())
    }

    #[test]
    fn test_extract_ids_and_numbers() {
        let m = mentions("Quote 600 of bb-pro-001 and HP-PRO-001 for CUST-001, order ORD-2024-001");
        assert_eq!(m.product_ids, vec!["BB-PRO-001", "HP-PRO-001"]);
        assert_eq!(m.customer_ids, vec!["CUST-001"]);
        assert_eq!(m.quantity, Some(600));
        assert!(m.wants_quote);
    }

    #[test]
    fn test_extract_tier_status_category() {
        let m = mentions("Which gold accounts have shipped basketball orders?");
        assert_eq!(m.tier, Some(CustomerTier::Gold));
        assert_eq!(m.status, Some(OrderStatus::Shipped));
        assert_eq!(m.category.as_deref(), Some("Basketballs"));
    }

    #[test]
    fn test_extract_multiword_category() {
        let m = mentions("pricing for court equipment");
        assert_eq!(m.category.as_deref(), Some("Court Equipment"));
    }

    #[test]
    fn test_sales_plans_quote_only_with_customer_and_products() {
        let call = plan(
            AgentKind::Sales,
            &mentions("quote 50 BB-PRO-001 for CUST-002"),
        )
        .unwrap();
        assert_eq!(call.tool, "create_quote");
        let body = call.body.unwrap();
        assert_eq!(body["customerId"], "CUST-002");
        assert_eq!(body["items"][0], json!({"productId": "BB-PRO-001", "qty": 50}));

        let call = plan(AgentKind::Sales, &mentions("quote for CUST-002")).unwrap();
        assert_eq!(call.tool, "get_orders");
    }

    #[test]
    fn test_sales_filters_orders_by_status() {
        let call = plan(AgentKind::Sales, &mentions("show pending orders")).unwrap();
        assert_eq!(call.query, vec![("status", "pending".to_string())]);
    }

    #[test]
    fn test_inventory_plans() {
        let call = plan(AgentKind::Inventory, &mentions("stock of TRN-CON-001?")).unwrap();
        assert_eq!(call.tool, "check_stock");
        assert_eq!(call.path_arg.as_deref(), Some("TRN-CON-001"));

        let call = plan(AgentKind::Inventory, &mentions("hoops in stock")).unwrap();
        assert_eq!(call.tool, "list_products");
        assert_eq!(call.query, vec![("category", "Hoops".to_string())]);
    }

    #[test]
    fn test_customer_plans() {
        let call = plan(AgentKind::Customer, &mentions("history for cust-004")).unwrap();
        assert_eq!(call.tool, "customer_history");
        assert_eq!(call.path_arg.as_deref(), Some("CUST-004"));

        let call = plan(AgentKind::Customer, &mentions("platinum customers")).unwrap();
        assert_eq!(call.query, vec![("tier", "Platinum".to_string())]);
    }

    #[test]
    fn test_pricing_plans() {
        let call = plan(
            AgentKind::Pricing,
            &mentions("bulk price for 100 BB-PRO-001, gold customer"),
        )
        .unwrap();
        assert_eq!(call.tool, "calculate_bulk_price");
        assert_eq!(
            call.body.unwrap(),
            json!({"productId": "BB-PRO-001", "quantity": 100, "customerTier": "Gold"})
        );

        let call = plan(AgentKind::Pricing, &mentions("price of UNI-JRS-001")).unwrap();
        assert_eq!(call.tool, "get_price");

        let call = plan(AgentKind::Pricing, &mentions("margins on training gear")).unwrap();
        assert_eq!(call.tool, "category_pricing");
        assert_eq!(call.path_arg.as_deref(), Some("Training"));

        assert!(plan(AgentKind::Pricing, &mentions("what is our pricing?")).is_none());
    }
}
