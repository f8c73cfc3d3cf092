//! # Ledger Rules
//!
//! Pure rules of the inventory ledger and the cash drawer state machine.
//! The database layer applies these numbers; it never decides them.
//!
//! ## Stock Direction
//! ```text
//! ┌───────────────┬───────────┬──────────────────────────────────┐
//! │ MovementType  │ Delta     │ Below zero                       │
//! ├───────────────┼───────────┼──────────────────────────────────┤
//! │ in            │ +quantity │ n/a                              │
//! │ out           │ −quantity │ rejected (NegativeStock)         │
//! │ adjustment    │ −quantity │ rejected (NegativeStock)         │
//! │ sale          │ −quantity │ permitted (oversell)             │
//! └───────────────┴───────────┴──────────────────────────────────┘
//! ```
//!
//! ## Drawer Lifecycle
//! ```text
//!   none ──open()──► open ──close(actual)──► closed   (terminal)
//!                     │ ▲
//!                     └─┘ manual in/out, sale cash flow
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CashDirection, CashDrawer, DrawerCloseReport, MovementType, StockReconciliation};

// =============================================================================
// Inventory
// =============================================================================

/// Signed stock change of a movement.
#[inline]
pub const fn stock_delta(movement_type: MovementType, quantity: i64) -> i64 {
    if movement_type.is_inbound() {
        quantity
    } else {
        -quantity
    }
}

/// Whether a movement may leave the product below zero.
#[inline]
pub const fn allows_negative_stock(movement_type: MovementType) -> bool {
    matches!(movement_type, MovementType::In | MovementType::Sale)
}

/// Computes the stock after a movement, enforcing the negative-stock rule.
///
/// ## Example
/// ```rust
/// use tillpoint_core::ledger::apply_movement;
/// use tillpoint_core::types::MovementType;
///
/// assert_eq!(apply_movement("p", 10, 3, MovementType::Sale).unwrap(), 7);
/// assert_eq!(apply_movement("p", 2, 3, MovementType::Sale).unwrap(), -1);
/// assert!(apply_movement("p", 2, 3, MovementType::Out).is_err());
/// ```
pub fn apply_movement(
    product_id: &str,
    current_stock: i64,
    quantity: i64,
    movement_type: MovementType,
) -> CoreResult<i64> {
    let new_stock = current_stock + stock_delta(movement_type, quantity);

    if new_stock < 0 && !allows_negative_stock(movement_type) {
        return Err(CoreError::NegativeStock {
            product_id: product_id.to_string(),
            current: current_stock,
            requested: quantity,
        });
    }

    Ok(new_stock)
}

/// Replays movements to derive the stock they imply.
pub fn derive_stock<I>(movements: I) -> i64
where
    I: IntoIterator<Item = (MovementType, i64)>,
{
    movements
        .into_iter()
        .map(|(movement_type, quantity)| stock_delta(movement_type, quantity))
        .sum()
}

/// Compares the cached counter with the ledger-derived stock.
pub fn reconcile(product_id: &str, cached_stock: i64, ledger_stock: i64) -> StockReconciliation {
    StockReconciliation {
        product_id: product_id.to_string(),
        cached_stock,
        ledger_stock,
        drift: cached_stock - ledger_stock,
    }
}

// =============================================================================
// Cash Drawer
// =============================================================================

/// Signed effect of a manual transaction on `current_balance`.
#[inline]
pub fn manual_delta(direction: CashDirection, amount: Money) -> Money {
    match direction {
        CashDirection::In => amount,
        CashDirection::Out => -amount,
    }
}

/// Net cash a sale leaves in the drawer: tendered cash minus change.
#[inline]
pub fn sale_cash_flow(cash_amount: Money, change_amount: Money) -> Money {
    cash_amount - change_amount
}

/// Requires an open drawer.
pub fn ensure_open(drawer: Option<CashDrawer>, user_id: &str) -> CoreResult<CashDrawer> {
    match drawer {
        Some(d) if d.is_open() => Ok(d),
        _ => Err(CoreError::NoOpenDrawer {
            user_id: user_id.to_string(),
        }),
    }
}

/// Reconciles counted cash against the expected balance.
///
/// `discrepancy = actual - expected`; positive is a surplus.
pub fn close_report(drawer: &CashDrawer, actual_balance: Money) -> DrawerCloseReport {
    let expected = drawer.expected_balance();
    DrawerCloseReport {
        drawer_id: drawer.id.clone(),
        expected_balance_cents: expected.cents(),
        actual_balance_cents: actual_balance.cents(),
        discrepancy_cents: (actual_balance - expected).cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
