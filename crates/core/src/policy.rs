//! Group-based access decisions and per-tool scope requirements.
//!
//! In production the authorization server evaluates these policies during
//! the token exchange. When an agent is not registered with the identity
//! provider the chat backend runs in demo mode and uses [`AccessPolicy`]
//! locally, so the same group rules still decide which agents a user may
//! reach.

use serde::Serialize;

use crate::agents::AgentKind;

/// Reason reported when no group grants access.
pub const NO_MATCHING_POLICY: &str = "no_matching_policy";

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum AccessDecision {
    Granted { scopes: Vec<&'static str> },
    Denied { reason: &'static str },
}

impl AccessDecision {
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// One group rule: members of `group` get `scopes` of `agent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rule {
    group: &'static str,
    agent: AgentKind,
    scopes: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        group: "ProGear-Sales",
        agent: AgentKind::Sales,
        scopes: AgentKind::Sales.scopes(),
    },
    Rule {
        group: "ProGear-Sales",
        agent: AgentKind::Inventory,
        scopes: &["inventory:read"],
    },
    Rule {
        group: "ProGear-Sales",
        agent: AgentKind::Customer,
        scopes: AgentKind::Customer.scopes(),
    },
    Rule {
        group: "ProGear-Sales",
        agent: AgentKind::Pricing,
        scopes: &["pricing:read"],
    },
    Rule {
        group: "ProGear-Warehouse",
        agent: AgentKind::Inventory,
        scopes: AgentKind::Inventory.scopes(),
    },
    Rule {
        group: "ProGear-Finance",
        agent: AgentKind::Pricing,
        scopes: AgentKind::Pricing.scopes(),
    },
];

/// The demo access policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Decide whether a user in `groups` may use `agent`.
    ///
    /// Scopes granted by several groups are merged without duplicates, in
    /// the agent's declared scope order.
    #[must_use]
    pub fn evaluate<S: AsRef<str>>(self, agent: AgentKind, groups: &[S]) -> AccessDecision {
        let granted: Vec<&'static str> = agent
            .scopes()
            .iter()
            .copied()
            .filter(|scope| {
                RULES.iter().any(|rule| {
                    rule.agent == agent
                        && rule.scopes.contains(scope)
                        && groups.iter().any(|g| g.as_ref() == rule.group)
                })
            })
            .collect();

        if granted.is_empty() {
            AccessDecision::Denied {
                reason: NO_MATCHING_POLICY,
            }
        } else {
            AccessDecision::Granted { scopes: granted }
        }
    }
}

/// Scope a tool-server endpoint requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolScope {
    InventoryRead,
    CustomerRead,
    SalesRead,
    SalesQuote,
    PricingRead,
}

impl ToolScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InventoryRead => "inventory:read",
            Self::CustomerRead => "customer:read",
            Self::SalesRead => "sales:read",
            Self::SalesQuote => "sales:quote",
            Self::PricingRead => "pricing:read",
        }
    }

    /// The scope for a tool name, if the tool exists.
    #[must_use]
    pub fn for_tool(tool: &str) -> Option<Self> {
        match tool {
            "list_products" | "check_stock" | "search_inventory" => Some(Self::InventoryRead),
            "get_customer" | "search_customers" | "customer_history" => Some(Self::CustomerRead),
            "get_orders" => Some(Self::SalesRead),
            "create_quote" => Some(Self::SalesQuote),
            "get_price" | "category_pricing" | "calculate_bulk_price" => Some(Self::PricingRead),
            _ => None,
        }
    }
}
