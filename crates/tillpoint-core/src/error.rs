//! # Error Types
//!
//! Domain-specific error types for tillpoint-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillpoint-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tillpoint-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  ledger-api errors (in app)                                            │
//! │  └── ApiError         - What HTTP clients see                          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! - NotFound: `ProductNotFound`, `SaleNotFound`, `NoOpenDrawer`
//! - Conflict: `DrawerAlreadyOpen`, `NegativeStock`
//! - Access: `Unauthenticated`, `Forbidden`, `MissingTenant`
//! - Input: `Validation`

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product does not exist under the caller's scope.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale does not exist under the caller's scope.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Caller has no open cash drawer.
    #[error("No open cash drawer for user {user_id}")]
    NoOpenDrawer { user_id: String },

    /// Caller already has an open cash drawer.
    ///
    /// ## When This Occurs
    /// ```text
    /// open(100.00) ──► Drawer A (open)
    /// open(50.00)  ──► DrawerAlreadyOpen ✗
    /// close(...)   ──► Drawer A (closed)
    /// open(50.00)  ──► Drawer B (open) ✓
    /// ```
    #[error("User {user_id} already has an open cash drawer")]
    DrawerAlreadyOpen { user_id: String },

    /// A direct outgoing movement would drive stock below zero.
    ///
    /// Never raised for sales, which may oversell.
    #[error("Stock for product {product_id} cannot go negative: current {current}, requested {requested}")]
    NegativeStock {
        product_id: String,
        current: i64,
        requested: i64,
    },

    /// No caller identity was presented.
    #[error("Authentication required")]
    Unauthenticated,

    /// Caller's role does not grant the capability.
    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: String, action: String },

    /// A non-global caller carries no tenant.
    #[error("User {user_id} is not assigned to a tenant")]
    MissingTenant { user_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
