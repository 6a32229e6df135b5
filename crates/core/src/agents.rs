//! The four ProGear sales agents.
//!
//! Each agent is a separate OAuth client in the identity provider with its
//! own authorization server and scope set. The chat backend routes a user
//! message to one or more agents and exchanges the user's token for an
//! agent-scoped token before calling the tool server.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An agent kind was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown agent kind: {0}")]
pub struct UnknownAgent(pub String);

/// Agent kinds, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Sales,
    Inventory,
    Customer,
    Pricing,
}

impl AgentKind {
    pub const ALL: [Self; 4] = [Self::Sales, Self::Inventory, Self::Customer, Self::Pricing];

    /// Lower-case type name (`sales`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Inventory => "inventory",
            Self::Customer => "customer",
            Self::Pricing => "pricing",
        }
    }

    /// Upper-case prefix of this agent's environment variables (`SALES`).
    #[must_use]
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::Sales => "SALES",
            Self::Inventory => "INVENTORY",
            Self::Customer => "CUSTOMER",
            Self::Pricing => "PRICING",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Sales => "ProGear Sales Agent",
            Self::Inventory => "ProGear Inventory Agent",
            Self::Customer => "ProGear Customer Agent",
            Self::Pricing => "ProGear Pricing Agent",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Sales => "Orders, quotes, and sales pipeline",
            Self::Inventory => "Stock levels, products, and warehouse",
            Self::Customer => "Accounts, contacts, and purchase history",
            Self::Pricing => "Pricing, margins, and discounts",
        }
    }

    /// UI accent colour.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Sales => "#3b82f6",
            Self::Inventory => "#10b981",
            Self::Customer => "#8b5cf6",
            Self::Pricing => "#f59e0b",
        }
    }

    /// UI icon name.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Sales => "ShoppingCart",
            Self::Inventory => "Package",
            Self::Customer => "Users",
            Self::Pricing => "DollarSign",
        }
    }

    /// Every scope this agent may be granted.
    #[must_use]
    pub const fn scopes(self) -> &'static [&'static str] {
        match self {
            Self::Sales => &["sales:read", "sales:quote", "sales:order"],
            Self::Inventory => &["inventory:read", "inventory:write", "inventory:alert"],
            Self::Customer => &["customer:read", "customer:lookup", "customer:history"],
            Self::Pricing => &["pricing:read", "pricing:margin", "pricing:discount"],
        }
    }

    /// Words that route a chat message to this agent.
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Sales => &["order", "quote", "sale", "pipeline", "deal", "purchase"],
            Self::Inventory => &[
                "stock",
                "inventory",
                "warehouse",
                "available",
                "supply",
                "reorder",
            ],
            Self::Customer => &["customer", "account", "contact", "history", "client"],
            Self::Pricing => &["price", "pricing", "cost", "margin", "discount", "bulk"],
        }
    }

    /// Agents whose keywords appear in `message`, in display order.
    ///
    /// Falls back to the sales agent when nothing matches.
    #[must_use]
    pub fn route(message: &str) -> Vec<Self> {
        let lower = message.to_lowercase();
        let matched: Vec<Self> = Self::ALL
            .into_iter()
            .filter(|kind| kind.keywords().iter().any(|word| lower.contains(word)))
            .collect();
        if matched.is_empty() {
            vec![Self::Sales]
        } else {
            matched
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAgent(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("Pricing".parse::<AgentKind>().unwrap(), AgentKind::Pricing);
        assert_eq!(
            "marketing".parse::<AgentKind>(),
            Err(UnknownAgent("marketing".to_string()))
        );
    }

    #[test]
    fn test_scopes_are_prefixed_by_kind() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.scopes().len(), 3);
            assert!(
                kind.scopes()
                    .iter()
                    .all(|s| s.starts_with(&format!("{}:", kind.as_str())))
            );
        }
    }

    #[test]
    fn test_route_single_agent() {
        assert_eq!(
            AgentKind::route("How many basketballs are in STOCK?"),
            vec![AgentKind::Inventory]
        );
    }

    #[test]
    fn test_route_multiple_agents_in_display_order() {
        assert_eq!(
            AgentKind::route("What discount can State University get on a quote?"),
            vec![AgentKind::Sales, AgentKind::Pricing]
        );
    }

    #[test]
    fn test_route_defaults_to_sales() {
        assert_eq!(AgentKind::route("hello there"), vec![AgentKind::Sales]);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgentKind::Customer).unwrap(),
            "\"customer\""
        );
    }
}
