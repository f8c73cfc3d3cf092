//! # Tillpoint Ledger API
//!
//! HTTP service recording sales, stock movements and cash drawer sessions.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger API Services                             │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ SaleProcessor  │  │InventoryLedger │  │  CashDrawerManager         ││
//! │  │                │  │                │  │                            ││
//! │  │ • create_sale  │  │ • record_move  │  │ • open / current           ││
//! │  │ • get_sale     │  │ • list_moves   │  │ • record_transaction       ││
//! │  │ • list_sales   │  │ • reconcile    │  │ • close                    ││
//! │  └───────┬────────┘  └────────────────┘  └────────────────────────────┘│
//! │          │ one SQL transaction                                          │
//! │          ├──► ReceiptSequencer::next_in                                 │
//! │          ├──► InventoryLedger::apply_sale_movement_in                   │
//! │          └──► CashDrawerManager::apply_sale_cash_flow_in                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │ SQLite       │  │ AuditSink    │  │    JWT Auth              ││  │
//! │  │  │ tillpoint-db │  │ (background) │  │    Caller + TenantScope  ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_HOST` / `HTTP_PORT` - listen address (default: 0.0.0.0:8080)
//! - `DATABASE_PATH` - SQLite file (default: ./tillpoint.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT validation
//! - `JWT_LIFETIME_SECS` - Lifetime of minted tokens (default: 86400)
//! - `RUST_LOG` - log filter (default: info,tillpoint=debug,sqlx=warn)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::extract::FromRef;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::auth::JwtManager;
use crate::services::{AuditSink, CashDrawerManager, InventoryLedger, SaleProcessor};
use tillpoint_db::Database;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub sales: SaleProcessor,
    pub inventory: InventoryLedger,
    pub drawers: CashDrawerManager,
}

impl AppState {
    /// Wires the services over one database and audit sink.
    pub fn new(db: Database, jwt: JwtManager, audit: Arc<dyn AuditSink>) -> Self {
        AppState {
            sales: SaleProcessor::new(db.clone(), audit.clone()),
            inventory: InventoryLedger::new(db.clone(), audit.clone()),
            drawers: CashDrawerManager::new(db.clone(), audit),
            jwt: Arc::new(jwt),
            db,
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Initializes the tracing/logging system.
///
/// ## Log Levels
/// - ERROR: Unrecoverable errors
/// - WARN: Recoverable issues (audit write failed, stock drift)
/// - INFO: Ledger operations (sale recorded, drawer closed)
/// - DEBUG: Repository activity
///
/// ## Environment Variable
/// Set `RUST_LOG` to control log level:
/// ```bash
/// RUST_LOG=debug ledger-api
/// RUST_LOG=tillpoint_db=trace ledger-api
/// ```
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillpoint=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
