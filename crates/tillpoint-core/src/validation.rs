//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                       │
//! │  └── Shape and type checks on request bodies                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services (Rust)                                              │
//! │  └── THIS MODULE: ranges, required ids, line counts                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on quantities and enums                         │
//! │  ├── UNIQUE receipt numbers and open-drawer index                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator runs before the first write of an operation, so a
//! rejected request leaves no trace.
//!
//! ## Usage
//! ```rust
//! use tillpoint_core::validation::{validate_quantity, validate_percentage};
//!
//! validate_quantity(5).unwrap();
//! validate_percentage("vat_percent", 20.0).unwrap();
//! assert!(validate_percentage("discount_percent", 120.0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Percent;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_MOVEMENT_QUANTITY, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of free-form text fields (reason, notes, description).
pub const MAX_TEXT_LEN: usize = 500;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates that an identifier is present.
///
/// Ids are opaque strings; the ledger never parses them.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an optional free-form text field.
pub fn validate_text(field: &str, text: Option<&str>) -> ValidationResult<()> {
    match text {
        Some(t) if t.chars().count() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale line quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
///
/// ## Example
/// ```rust
/// use tillpoint_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(10_000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock movement quantity.
///
/// Deliveries can be far larger than a sale line, so the ceiling is
/// MAX_MOVEMENT_QUANTITY rather than MAX_ITEM_QUANTITY.
pub fn validate_movement_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a decimal percentage (20.0 = 20%) and converts it to basis points.
///
/// ## Example
/// ```rust
/// use tillpoint_core::validation::validate_percentage;
///
/// assert_eq!(validate_percentage("vat_percent", 20.0).unwrap().bps(), 2000);
/// assert!(validate_percentage("vat_percent", -1.0).is_err());
/// assert!(validate_percentage("vat_percent", f64::NAN).is_err());
/// ```
pub fn validate_percentage(field: &str, pct: f64) -> ValidationResult<Percent> {
    if !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(Percent::from_percentage(pct))
}

/// Validates a monetary amount lies in 0..=MAX_AMOUNT_CENTS.
///
/// ## Example
/// ```rust
/// use tillpoint_core::validation::validate_non_negative_amount;
/// use tillpoint_core::MAX_AMOUNT_CENTS;
///
/// assert!(validate_non_negative_amount("cash_amount", 0).is_ok());
/// assert!(validate_non_negative_amount("cash_amount", MAX_AMOUNT_CENTS).is_ok());
/// assert!(validate_non_negative_amount("cash_amount", MAX_AMOUNT_CENTS + 1).is_err());
/// ```
pub fn validate_non_negative_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    check_amount_ceiling(field, cents, 0)
}

/// Validates a monetary amount lies in 1..=MAX_AMOUNT_CENTS.
pub fn validate_positive_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    check_amount_ceiling(field, cents, 1)
}

fn check_amount_ceiling(field: &str, cents: i64, min: i64) -> ValidationResult<()> {
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Validates the number of lines in a sale.
///
/// ## Rules
/// - At least one line
/// - At most MAX_SALE_LINES (100)
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("product_id", "p-1").is_ok());
        assert!(matches!(
            validate_id("product_id", "   "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("notes", None).is_ok());
        assert!(validate_text("notes", Some("walk-in customer")).is_ok());
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(validate_text("notes", Some(&long)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_movement_quantity() {
        assert!(validate_movement_quantity(50_000).is_ok());
        assert!(validate_movement_quantity(MAX_MOVEMENT_QUANTITY).is_ok());
        assert!(validate_movement_quantity(0).is_err());
        assert!(matches!(
            validate_movement_quantity(MAX_MOVEMENT_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_movement_quantity(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert_eq!(validate_percentage("discount_percent", 0.0).unwrap(), Percent::zero());
        assert_eq!(validate_percentage("discount_percent", 12.5).unwrap().bps(), 1250);
        assert_eq!(validate_percentage("discount_percent", 100.0).unwrap().bps(), 10_000);
        assert!(validate_percentage("discount_percent", 100.01).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_non_negative_amount("opening_balance", 0).is_ok());
        assert!(validate_non_negative_amount("opening_balance", -1).is_err());
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
    }

    #[test]
    fn test_amount_ceiling() {
        assert!(validate_non_negative_amount("unit_price", MAX_AMOUNT_CENTS).is_ok());
        assert!(matches!(
            validate_non_negative_amount("unit_price", MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_AMOUNT_CENTS, .. })
        ));
        assert!(validate_non_negative_amount("unit_price", i64::MAX / 2 + 10).is_err());
        assert!(validate_positive_amount("amount", i64::MAX).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_SALE_LINES).is_ok());
        assert!(matches!(
            validate_line_count(0),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_line_count(MAX_SALE_LINES + 1).is_err());
    }
}
