//! # tillpoint-db: Database Layer for the Tillpoint Ledger
//!
//! SQLite persistence for products' stock, movements, cash drawers, sales,
//! receipt counters and audit logs, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillpoint Data Flow                              │
//! │                                                                         │
//! │  ledger-api service (SaleProcessor, InventoryLedger, ...)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tillpoint-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Product Stock │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Drawer Sale   │    │ 001_ledger_  │  │   │
//! │  │   │ begin() → tx  │    │ Receipt Audit │    │   schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillpoint_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tillpoint.db")).await?;
//! let sale = db.sales().get(&caller.scope(), "sale-id").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::{AuditRecord, AuditRepository};
pub use repository::drawer::{DrawerOwner, DrawerRepository};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::receipt::ReceiptRepository;
pub use repository::sale::{SaleFilter, SaleRepository};
pub use repository::stock::{AppliedMovement, MovementFilter, NewMovement, StockRepository};
