//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET  /health                          (no auth)                       │
//! │                                                                         │
//! │  /api  (Authorization: Bearer <jwt>)                                    │
//! │  ├── POST /sales                       SaleProcessor::create_sale      │
//! │  ├── GET  /sales                       SaleProcessor::list_sales       │
//! │  ├── GET  /sales/{id}                  SaleProcessor::get_sale         │
//! │  ├── POST /stock/movements             InventoryLedger::record_movement│
//! │  ├── GET  /stock/movements             InventoryLedger::list_movements │
//! │  ├── GET  /stock/reconcile/{id}        InventoryLedger::reconcile      │
//! │  ├── GET  /products                    InventoryLedger::list_products  │
//! │  ├── GET  /products/{id}               InventoryLedger::lookup_product │
//! │  ├── POST /cashier/open                CashDrawerManager::open         │
//! │  ├── GET  /cashier/current             CashDrawerManager::current      │
//! │  ├── POST /cashier/transaction         CashDrawerManager::record_tx    │
//! │  └── POST /cashier/close               CashDrawerManager::close        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Extractor rejections (malformed JSON, bad query strings) are reported in
//! the same `{code, message}` shape as every other error.

pub mod cashier;
pub mod health;
pub mod sales;
pub mod stock;

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

/// JSON body extractor with [`ApiError`] rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with [`ApiError`] rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor with [`ApiError`] rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/sales", post(sales::create_sale).get(sales::list_sales))
        .route("/sales/{id}", get(sales::get_sale))
        .route(
            "/stock/movements",
            post(stock::record_movement).get(stock::list_movements),
        )
        .route("/stock/reconcile/{product_id}", get(stock::reconcile))
        .route("/products", get(stock::list_products))
        .route("/products/{id}", get(stock::get_product))
        .route("/cashier/open", post(cashier::open))
        .route("/cashier/current", get(cashier::current))
        .route("/cashier/transaction", post(cashier::record_transaction))
        .route("/cashier/close", post(cashier::close));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// End-to-end Tests
// =============================================================================
