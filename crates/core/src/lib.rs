//! ProGear Core - Shared domain library.
//!
//! This crate provides the types and rules used across all ProGear components:
//! - `mcp-server` - REST tool server guarded by bearer tokens
//! - `agent-api` - Agent backend performing ID-JAG token exchange
//! - `cli` - Operator tooling for catalog checks and offline quotes
//!
//! # Architecture
//!
//! The core crate contains only types, data and pure functions - no network
//! access and no HTTP clients. File access is limited to loading an
//! alternative catalog from disk.
//!
//! # Modules
//!
//! - [`types`] - Newtype codes, emails, tiers and statuses
//! - [`catalog`] - Products, customers, orders and discount tables
//! - [`pricing`] - Margins, volume/tier discounts, quotes and bulk pricing
//! - [`agents`] - The four sales agents and their scopes
//! - [`policy`] - Group-based access decisions and per-tool scopes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod agents;
pub mod catalog;
pub mod policy;
pub mod pricing;
pub mod types;

pub use agents::{AgentKind, UnknownAgent};
pub use catalog::{
    Catalog, CatalogError, Customer, DiscountTiers, Order, OrderLine, Product, VolumeTier,
};
pub use policy::{AccessDecision, AccessPolicy, ToolScope};
pub use pricing::{PricingError, QuoteItem};
pub use types::*;
