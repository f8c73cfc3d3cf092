//! # Receipt Numbers
//!
//! Formatting of human-readable receipt identifiers.
//!
//! ```text
//!   RCP-20240315-0042
//!   ─┬─ ───┬──── ──┬─
//!    │     │       └── per-tenant, per-day sequence (zero-padded to 4)
//!    │     └────────── UTC calendar day of the sale
//!    └──────────────── fixed prefix
//! ```
//!
//! The sequence value itself comes from an atomic counter in the database;
//! this module only turns `(day, value)` into text.

use chrono::NaiveDate;

/// Fixed receipt prefix.
pub const RECEIPT_PREFIX: &str = "RCP";

/// Returns the day part shared by all receipts of a day: `RCP-YYYYMMDD`.
pub fn day_prefix(day: NaiveDate) -> String {
    format!("{}-{}", RECEIPT_PREFIX, day.format("%Y%m%d"))
}

/// Formats a receipt number.
///
/// Sequences beyond 9999 widen rather than wrap.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tillpoint_core::receipt::format_receipt_number;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// assert_eq!(format_receipt_number(day, 1), "RCP-20240315-0001");
/// ```
pub fn format_receipt_number(day: NaiveDate, sequence: u32) -> String {
    format!("{}-{:04}", day_prefix(day), sequence)
}

/// Day key used by the sequence table (`YYYYMMDD`).
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}
