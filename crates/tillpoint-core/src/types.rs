//! # Domain Types
//!
//! Core domain types of the transaction & ledger subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  MUTABLE AGGREGATES                 IMMUTABLE RECORDS                   │
//! │  ┌─────────────────┐               ┌─────────────────┐                 │
//! │  │    Product      │  1 ──────── * │  StockMovement  │                 │
//! │  │  current_stock  │               │  in/out/adj/sale│                 │
//! │  └─────────────────┘               └─────────────────┘                 │
//! │  ┌─────────────────┐               ┌─────────────────┐                 │
//! │  │   CashDrawer    │  1 ──────── * │      Sale       │                 │
//! │  │  open → closed  │               │  receipt_number │                 │
//! │  │  transactions[] │               │  items[]        │                 │
//! │  └─────────────────┘               └─────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenant Back-References
//! Every record carries `tenant_id` purely for scoping. It is `None` only for
//! records written by a global administrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Percent};

// =============================================================================
// Product
// =============================================================================

/// A product as seen by the ledger.
///
/// Product CRUD lives outside this subsystem; the ledger only reads prices and
/// moves `current_stock`, which is a cached projection of the movement log.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: Option<String>,
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price_cents: i64,
    pub purchase_price_cents: Option<i64>,
    /// Signed: sales may oversell below zero.
    pub current_stock: i64,
    pub branch_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Kind of inventory change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Goods received; increases stock.
    In,
    /// Goods removed (damage, transfer out); decreases stock.
    Out,
    /// Stock-take correction; decreases stock.
    Adjustment,
    /// Goods sold through the till; decreases stock, may oversell.
    Sale,
}

impl MovementType {
    /// Whether this movement adds to stock.
    #[inline]
    pub const fn is_inbound(&self) -> bool {
        matches!(self, MovementType::In)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Adjustment => "adjustment",
            MovementType::Sale => "sale",
        }
    }
}

/// Append-only inventory ledger entry. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: Option<String>,
    pub product_id: String,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    /// Free-form reference (receipt number for sales, delivery note, ...).
    pub reference: Option<String>,
    pub branch_id: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Result of comparing the cached stock counter against the movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockReconciliation {
    pub product_id: String,
    /// `Product.current_stock` as stored.
    pub cached_stock: i64,
    /// Stock derived by replaying every movement for the product.
    pub ledger_stock: i64,
    /// `cached_stock - ledger_stock`; zero when consistent.
    pub drift: i64,
}

// =============================================================================
// Cash Drawer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DrawerStatus {
    Open,
    /// Terminal. A new session creates a new drawer.
    Closed,
}

/// Direction of a manual cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CashDirection {
    In,
    Out,
}

/// A manual cash-in / cash-out entry on a drawer's sub-ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DrawerTransaction {
    pub id: String,
    pub drawer_id: String,
    pub amount_cents: i64,
    pub direction: CashDirection,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A cashier's till session.
///
/// ## Balances
/// - `current_balance`: opening balance plus manual transactions
/// - `expected_balance`: opening balance plus net cash taken by sales
///
/// The two are tracked independently; closing compares the counted cash
/// against `expected_balance`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashDrawer {
    pub id: String,
    pub tenant_id: Option<String>,
    pub user_id: String,
    pub branch_id: Option<String>,
    pub opening_balance_cents: i64,
    pub current_balance_cents: i64,
    pub expected_balance_cents: i64,
    pub status: DrawerStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub transactions: Vec<DrawerTransaction>,
}

impl CashDrawer {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == DrawerStatus::Open
    }

    #[inline]
    pub fn expected_balance(&self) -> Money {
        Money::from_cents(self.expected_balance_cents)
    }

    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }
}

/// Outcome of closing a drawer. The discrepancy is reported, never corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawerCloseReport {
    pub drawer_id: String,
    pub expected_balance_cents: i64,
    pub actual_balance_cents: i64,
    /// `actual - expected`: positive means surplus, negative means shortage.
    pub discrepancy_cents: i64,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash; change is computed.
    Cash,
    /// Card or bank transfer.
    Bank,
    /// Part cash, part bank.
    Mixed,
}

// =============================================================================
// Sale
// =============================================================================

/// A line of a sale.
///
/// Stores the price/discount/VAT inputs together with the computed figures so
/// the sale stays historically accurate when the product later changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_bps: u32,
    pub vat_bps: u32,
    /// quantity × unit price, before discount.
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub vat_amount_cents: i64,
    /// After discount, including VAT.
    pub total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn discount(&self) -> Percent {
        Percent::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn vat(&self) -> Percent {
        Percent::from_bps(self.vat_bps)
    }
}

/// A recorded sale. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: Option<String>,
    pub receipt_number: String,
    pub subtotal_cents: i64,
    pub total_discount_cents: i64,
    pub total_vat_cents: i64,
    /// `subtotal - total_discount + total_vat`.
    pub grand_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub cash_amount_cents: i64,
    pub bank_amount_cents: i64,
    pub change_amount_cents: i64,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub user_id: String,
    pub branch_id: Option<String>,
    pub cash_drawer_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<SaleItem>,
}

impl Sale {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Auditable operations of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreateSale,
    StockMovement,
    OpenDrawer,
    CloseDrawer,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateSale => "create_sale",
            AuditAction::StockMovement => "stock_movement",
            AuditAction::OpenDrawer => "open_drawer",
            AuditAction::CloseDrawer => "close_drawer",
        }
    }

    /// Entity type the action refers to.
    pub const fn entity_type(&self) -> &'static str {
        match self {
            AuditAction::CreateSale => "sale",
            AuditAction::StockMovement => "stock",
            AuditAction::OpenDrawer | AuditAction::CloseDrawer => "cash_drawer",
        }
    }
}

/// A fire-and-forget audit record emitted after a ledger operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub action: AuditAction,
    pub entity_id: String,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: Option<String>,
        action: AuditAction,
        entity_id: impl Into<String>,
    ) -> Self {
        AuditEvent {
            user_id: user_id.into(),
            tenant_id,
            action,
            entity_id: entity_id.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_type_direction() {
        assert!(MovementType::In.is_inbound());
        assert!(!MovementType::Out.is_inbound());
        assert!(!MovementType::Adjustment.is_inbound());
        assert!(!MovementType::Sale.is_inbound());
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&MovementType::Adjustment).unwrap(), "\"adjustment\"");
        assert_eq!(serde_json::to_string(&DrawerStatus::Open).unwrap(), "\"open\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::Bank).unwrap(), "\"bank\"");
        let parsed: CashDirection = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(parsed, CashDirection::Out);
    }

    #[test]
    fn test_audit_action_names() {
        assert_eq!(AuditAction::CreateSale.as_str(), "create_sale");
        assert_eq!(AuditAction::CreateSale.entity_type(), "sale");
        assert_eq!(AuditAction::CloseDrawer.entity_type(), "cash_drawer");
        assert_eq!(AuditAction::StockMovement.entity_type(), "stock");
    }
}
