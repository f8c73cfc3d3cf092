//! Ledger service implementations.
//!
//! Each service checks the caller's capability, validates its input, calls
//! the repositories and records its audit event. HTTP concerns stay in
//! [`crate::routes`].

pub mod audit;
pub mod drawer;
pub mod inventory;
pub mod receipt;
pub mod sale;

pub use audit::{AuditSink, DbAuditSink, MemoryAuditSink};
pub use drawer::CashDrawerManager;
pub use inventory::InventoryLedger;
pub use receipt::ReceiptSequencer;
pub use sale::SaleProcessor;
