//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  ledger-api service                                                    │
//! │       │                                                                 │
//! │       ├── db.sales().get(&scope, id)          pooled, read-only         │
//! │       │                                                                 │
//! │       └── let mut tx = db.begin()             one unit of work          │
//! │           StockRepository::apply_movement_in(&mut tx, ..)              │
//! │           ReceiptRepository::next_number_in(&mut tx, ..)               │
//! │           SaleRepository::insert_in(&mut tx, ..)                       │
//! │           tx.commit()                                                  │
//! │                                                                         │
//! │  `*_in` functions take `&mut SqliteConnection` so they compose inside  │
//! │  a caller's transaction; the rest borrow a connection from the pool.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Scoped product reads
//! - [`StockRepository`](stock::StockRepository) - Movements, deltas, reconciliation
//! - [`DrawerRepository`](drawer::DrawerRepository) - Till sessions
//! - [`ReceiptRepository`](receipt::ReceiptRepository) - Receipt counters
//! - [`SaleRepository`](sale::SaleRepository) - Sales and items
//! - [`AuditRepository`](audit::AuditRepository) - Audit log

pub mod audit;
pub mod drawer;
pub mod product;
pub mod receipt;
pub mod sale;
pub mod stock;
