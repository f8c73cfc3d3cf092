//! # tillpoint-core: Pure Business Logic for the Tillpoint Ledger
//!
//! This crate is the **heart** of the transaction & ledger subsystem. It holds
//! every rule that decides a number or a state transition, as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillpoint Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  ledger-api (axum routes)                       │   │
//! │  │   POST /sales, /stock/movements, /cashier/open|close ...        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ tillpoint-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │  scope  │ │ receipt │  │   │
//! │  │   │  Sale   │ │  Money  │ │ totals  │ │ Caller  │ │ RCP-... │  │   │
//! │  │   │ Drawer  │ │ Percent │ │ change  │ │  Role   │ │         │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tillpoint-db (Database Layer)                   │   │
//! │  │         SQLite queries, migrations, repositories                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, CashDrawer, Sale, ...)
//! - [`money`] - Money and Percent types with integer arithmetic
//! - [`pricing`] - Sale line and aggregate total computation
//! - [`scope`] - Caller identity, roles, tenant scope resolution
//! - [`ledger`] - Stock movement and cash drawer rules
//! - [`receipt`] - Receipt number formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tillpoint_core::money::{Money, Percent};
//! use tillpoint_core::pricing::LineInput;
//!
//! let line = LineInput {
//!     quantity: 2,
//!     unit_price: Money::from_cents(200),
//!     discount: Percent::zero(),
//!     vat: Percent::from_bps(2000),
//! };
//! let totals = tillpoint_core::pricing::compute_line(&line).unwrap();
//! assert_eq!(totals.vat_amount.cents(), 80);
//! assert_eq!(totals.total.cents(), 480);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod scope;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use scope::{Caller, Capability, Role, TenantScope};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single sale.
///
/// ## Business Reason
/// Prevents runaway requests and keeps one sale inside one short transaction.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single sale line.
///
/// ## Business Reason
/// Catches fat-finger entries (typing 10000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest amount accepted for any single money input (unit price, payment,
/// drawer balance or cash movement): 1,000,000,000.00.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Largest quantity of a single direct stock movement.
pub const MAX_MOVEMENT_QUANTITY: i64 = 1_000_000;

/// Largest figure a computed sale total may reach.
///
/// Keeps `subtotal - discount + vat` and `cash - grand_total` inside `i64`.
pub const MAX_TOTAL_CENTS: i64 = 1_000_000_000_000_000;
