//! Status and tier enums for catalog entities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Customer account tier, derived from lifetime spend.
///
/// Declaration order is the display order (highest tier first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CustomerTier {
    /// More than $25,000 lifetime.
    Platinum,
    /// $10,000 - $25,000 lifetime.
    Gold,
    /// $5,000 - $10,000 lifetime.
    Silver,
    /// Under $5,000 lifetime.
    Bronze,
}

impl CustomerTier {
    /// All tiers, highest first.
    pub const ALL: [Self; 4] = [Self::Platinum, Self::Gold, Self::Silver, Self::Bronze];

    /// Tier name as shown to users and used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Platinum => "Platinum",
            Self::Gold => "Gold",
            Self::Silver => "Silver",
            Self::Bronze => "Bronze",
        }
    }

    /// Parse a tier name case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn parse_loose(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// All statuses in fulfillment order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Lower-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock health relative to a product's reorder point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// At or below the reorder point.
    Low,
    /// Above the reorder point but not more than twice it.
    Adequate,
    /// More than twice the reorder point.
    Good,
}

impl StockStatus {
    /// Classify a stock level against its reorder point.
    #[must_use]
    pub const fn classify(stock: u32, reorder_point: u32) -> Self {
        if stock <= reorder_point {
            Self::Low
        } else if stock as u64 > reorder_point as u64 * 2 {
            Self::Good
        } else {
            Self::Adequate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse_loose() {
        assert_eq!(CustomerTier::parse_loose("gold"), Some(CustomerTier::Gold));
        assert_eq!(
            CustomerTier::parse_loose(" PLATINUM "),
            Some(CustomerTier::Platinum)
        );
        assert_eq!(CustomerTier::parse_loose("diamond"), None);
    }

    #[test]
    fn test_tier_order_is_highest_first() {
        assert!(CustomerTier::Platinum < CustomerTier::Bronze);
    }

    #[test]
    fn test_order_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).expect("serialize"),
            "\"processing\""
        );
        assert_eq!(OrderStatus::Delivered.as_str(), "delivered");
    }

    #[test]
    fn test_stock_status_boundaries() {
        assert_eq!(StockStatus::classify(500, 500), StockStatus::Low);
        assert_eq!(StockStatus::classify(501, 500), StockStatus::Adequate);
        assert_eq!(StockStatus::classify(1000, 500), StockStatus::Adequate);
        assert_eq!(StockStatus::classify(1001, 500), StockStatus::Good);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::Low);
    }
}
