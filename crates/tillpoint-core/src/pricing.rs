//! # Pricing
//!
//! Sale line and aggregate total computation.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per line (exact, no rounding):                                        │
//! │                                                                         │
//! │    subtotal       = quantity × unit_price                               │
//! │    discount       = subtotal × discount_bps / 10000                     │
//! │    after_discount = subtotal − discount                                 │
//! │    vat            = after_discount × vat_bps / 10000                    │
//! │    total          = after_discount + vat                                │
//! │                                                                         │
//! │  Per sale:                                                              │
//! │    subtotal, total_discount, total_vat = round(Σ exact line values)     │
//! │    grand_total = subtotal − total_discount + total_vat                  │
//! │    change      = max(0, cash − grand_total)   (cash payments only)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fixed Point
//! Intermediate values live in `i128` at 10⁻⁸ cent resolution: a basis-point
//! factor adds four decimal places and there are at most two in a chain
//! (discount, then VAT), so every intermediate is exact. Rounding to cents
//! happens only for stored figures and uses round-half-away-from-zero.
//!
//! Every step is checked: a figure that leaves `i128`, or a rounded total
//! beyond `MAX_TOTAL_CENTS`, yields `ValidationError::OutOfRange` instead of
//! wrapping.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Percent};
use crate::types::PaymentMethod;
use crate::validation::ValidationResult;
use crate::MAX_TOTAL_CENTS;

/// One basis-point factor (10⁻⁴).
const BPS: i128 = Percent::FULL_BPS as i128;

/// Scale of the exact representation relative to cents.
const EXACT_SCALE: i128 = BPS * BPS;

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Price inputs of one sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Percent,
    pub vat: Percent,
}

/// Computed figures of one sale line, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    /// quantity × unit price
    pub subtotal: Money,
    pub discount: Money,
    pub vat_amount: Money,
    /// after discount, VAT included
    pub total: Money,
    exact: ExactLine,
}

/// Exact line values at 10⁻⁸ cent resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ExactLine {
    subtotal: i128,
    discount: i128,
    vat: i128,
}

/// Aggregate figures of a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleTotals {
    pub lines: Vec<LineTotals>,
    pub subtotal: Money,
    pub total_discount: Money,
    pub total_vat: Money,
    /// Always equals `subtotal - total_discount + total_vat`.
    pub grand_total: Money,
}

// =============================================================================
// Computation
// =============================================================================

/// Computes the totals of a single line.
pub fn compute_line(line: &LineInput) -> ValidationResult<LineTotals> {
    let subtotal = checked(
        i128::from(line.quantity)
            .checked_mul(i128::from(line.unit_price.cents()))
            .and_then(|v| v.checked_mul(EXACT_SCALE)),
    )?;
    let discount = checked(subtotal.checked_mul(i128::from(line.discount.bps())))? / BPS;
    let after_discount = subtotal - discount;
    // after_discount is a multiple of BPS, so this division is exact.
    let vat = checked(after_discount.checked_mul(i128::from(line.vat.bps())))? / BPS;
    let total = checked(after_discount.checked_add(vat))?;

    Ok(LineTotals {
        subtotal: round_exact(subtotal)?,
        discount: round_exact(discount)?,
        vat_amount: round_exact(vat)?,
        total: round_exact(total)?,
        exact: ExactLine {
            subtotal,
            discount,
            vat,
        },
    })
}

/// Computes line and aggregate totals of a sale.
///
/// ## Example
/// ```rust
/// use tillpoint_core::money::{Money, Percent};
/// use tillpoint_core::pricing::{compute_sale, LineInput};
///
/// let totals = compute_sale(&[LineInput {
///     quantity: 2,
///     unit_price: Money::from_cents(200),
///     discount: Percent::zero(),
///     vat: Percent::from_bps(2000),
/// }])
/// .unwrap();
/// assert_eq!(totals.subtotal.cents(), 400);
/// assert_eq!(totals.total_vat.cents(), 80);
/// assert_eq!(totals.grand_total.cents(), 480);
/// ```
pub fn compute_sale(lines: &[LineInput]) -> ValidationResult<SaleTotals> {
    let lines = lines
        .iter()
        .map(compute_line)
        .collect::<ValidationResult<Vec<LineTotals>>>()?;

    let mut sum = ExactLine::default();
    for l in &lines {
        sum = ExactLine {
            subtotal: checked(sum.subtotal.checked_add(l.exact.subtotal))?,
            discount: checked(sum.discount.checked_add(l.exact.discount))?,
            vat: checked(sum.vat.checked_add(l.exact.vat))?,
        };
    }

    let subtotal = round_exact(sum.subtotal)?;
    let total_discount = round_exact(sum.discount)?;
    let total_vat = round_exact(sum.vat)?;

    // Each term is within MAX_TOTAL_CENTS, far from the i64 edge.
    Ok(SaleTotals {
        lines,
        subtotal,
        total_discount,
        total_vat,
        grand_total: subtotal - total_discount + total_vat,
    })
}

/// Change owed to the customer.
///
/// Only cash payments produce change, and change is never negative.
///
/// ## Example
/// ```rust
/// use tillpoint_core::money::Money;
/// use tillpoint_core::pricing::change_due;
/// use tillpoint_core::types::PaymentMethod;
///
/// let grand = Money::from_cents(480);
/// assert_eq!(change_due(PaymentMethod::Cash, Money::from_cents(500), grand).cents(), 20);
/// assert_eq!(change_due(PaymentMethod::Cash, Money::from_cents(400), grand).cents(), 0);
/// assert_eq!(change_due(PaymentMethod::Bank, Money::from_cents(500), grand).cents(), 0);
/// ```
pub fn change_due(method: PaymentMethod, cash_amount: Money, grand_total: Money) -> Money {
    match method {
        PaymentMethod::Cash => (cash_amount - grand_total).non_negative(),
        PaymentMethod::Bank | PaymentMethod::Mixed => Money::zero(),
    }
}

/// Rounds an exact value to cents, half away from zero.
fn round_exact(value: i128) -> ValidationResult<Money> {
    let half = (EXACT_SCALE / 2) as u128;
    let magnitude = (value.unsigned_abs() + half) / EXACT_SCALE as u128;

    let cents = i64::try_from(magnitude)
        .ok()
        .filter(|cents| *cents <= MAX_TOTAL_CENTS)
        .ok_or_else(total_out_of_range)?;

    Ok(Money::from_cents(if value >= 0 { cents } else { -cents }))
}

fn checked(value: Option<i128>) -> ValidationResult<i128> {
    value.ok_or_else(total_out_of_range)
}

fn total_out_of_range() -> ValidationError {
    ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: MAX_TOTAL_CENTS,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
