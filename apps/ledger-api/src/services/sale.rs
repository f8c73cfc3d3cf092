//! # Sale Transaction Processor
//!
//! Records a sale as one unit of work across the ledgers.
//!
//! ## Processing a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request (lines, quantities, rates, amounts)  ── no writes    │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  BEGIN                                                                  │
//! │    ├── receipt number        ReceiptSequencer::next_in  (first write)   │
//! │    ├── caller's open drawer (optional)                                  │
//! │    ├── per line:                                                        │
//! │    │     product (scoped)    missing → ProductNotFound                  │
//! │    │     sale movement       InventoryLedger::apply_sale_movement_in    │
//! │    ├── totals                pricing::compute_sale, change_due          │
//! │    ├── sale + items          SaleRepository::insert_in                  │
//! │    └── drawer cash flow      expected += cash - change                  │
//! │  COMMIT  ── any error before this point rolls every write back         │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  audit create_sale {total}                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches the pool while the transaction is open. The receipt
//! counter upsert is the first statement so the transaction holds the write
//! lock from the start; a read first would fail with SQLITE_BUSY once another
//! sale commits in between.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::audit::AuditSink;
use crate::services::drawer::CashDrawerManager;
use crate::services::inventory::InventoryLedger;
use crate::services::receipt::ReceiptSequencer;
use tillpoint_core::pricing::{change_due, compute_sale, LineInput};
use tillpoint_core::validation::{
    validate_id, validate_line_count, validate_non_negative_amount, validate_percentage,
    validate_quantity, validate_text,
};
use tillpoint_core::{
    AuditAction, AuditEvent, Caller, Capability, Money, PaymentMethod, Percent, Sale, SaleItem,
    ValidationError,
};
use tillpoint_db::{
    Database, DbError, DrawerRepository, ProductRepository, SaleFilter, SaleRepository,
};

/// One requested sale line.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's current sale price.
    pub unit_price_cents: Option<i64>,
    /// Decimal percent, 0–100.
    pub discount_percent: Option<f64>,
    /// Decimal percent, 0–100.
    pub vat_percent: Option<f64>,
}

/// A sale to record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSaleRequest {
    pub items: Vec<SaleLineRequest>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub cash_amount_cents: i64,
    #[serde(default)]
    pub bank_amount_cents: i64,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

/// A line after validation; the unit price may still come from the product.
struct ValidatedLine {
    quantity: i64,
    unit_price: Option<Money>,
    discount: Percent,
    vat: Percent,
}

/// The sale transaction processor.
#[derive(Clone)]
pub struct SaleProcessor {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl SaleProcessor {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        SaleProcessor { db, audit }
    }

    /// Records a sale atomically.
    ///
    /// ## Errors
    /// - `Validation` for a malformed request (nothing written)
    /// - `ProductNotFound` for any line whose product isn't visible
    ///   (every write of the sale rolled back)
    pub async fn create_sale(&self, caller: &Caller, request: NewSaleRequest) -> ApiResult<Sale> {
        caller.require(Capability::RecordSale)?;
        let lines = validate_sale(&request)?;

        let scope = caller.scope();
        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();

        let mut tx = self.db.begin().await?;

        let receipt_number =
            ReceiptSequencer::next_in(&mut tx, caller.tenant_id(), now.date_naive()).await?;
        let drawer = DrawerRepository::find_open_in(&mut tx, CashDrawerManager::owner(caller)).await?;

        let mut inputs = Vec::with_capacity(lines.len());
        let mut snapshots = Vec::with_capacity(lines.len());

        for (line, requested) in lines.iter().zip(&request.items) {
            let product = ProductRepository::get_in(&mut tx, &scope, &requested.product_id).await?;

            InventoryLedger::apply_sale_movement_in(
                &mut tx,
                caller,
                &product,
                line.quantity,
                &receipt_number,
            )
            .await?;

            inputs.push(LineInput {
                quantity: line.quantity,
                unit_price: line.unit_price.unwrap_or_else(|| product.sale_price()),
                discount: line.discount,
                vat: line.vat,
            });
            snapshots.push((product.id, product.name));
        }

        let totals = compute_sale(&inputs)?;
        let cash_amount = Money::from_cents(request.cash_amount_cents);
        let change = change_due(request.payment_method, cash_amount, totals.grand_total);

        let items = inputs
            .iter()
            .zip(&totals.lines)
            .zip(snapshots)
            .map(|((input, line), (product_id, product_name))| SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id,
                product_name: Some(product_name),
                quantity: input.quantity,
                unit_price_cents: input.unit_price.cents(),
                discount_bps: input.discount.bps(),
                vat_bps: input.vat.bps(),
                subtotal_cents: line.subtotal.cents(),
                discount_cents: line.discount.cents(),
                vat_amount_cents: line.vat_amount.cents(),
                total_cents: line.total.cents(),
            })
            .collect();

        let sale = Sale {
            id: sale_id,
            tenant_id: caller.tenant_id().map(str::to_string),
            receipt_number,
            subtotal_cents: totals.subtotal.cents(),
            total_discount_cents: totals.total_discount.cents(),
            total_vat_cents: totals.total_vat.cents(),
            grand_total_cents: totals.grand_total.cents(),
            payment_method: request.payment_method,
            cash_amount_cents: cash_amount.cents(),
            bank_amount_cents: request.bank_amount_cents,
            change_amount_cents: change.cents(),
            customer_name: request.customer_name,
            notes: request.notes,
            user_id: caller.user_id().to_string(),
            branch_id: caller.branch_id().map(str::to_string),
            cash_drawer_id: drawer.as_ref().map(|d| d.id.clone()),
            created_at: now,
            items,
        };

        SaleRepository::insert_in(&mut tx, &sale).await?;

        if let Some(drawer) = &drawer {
            if !(cash_amount - change).is_zero() {
                CashDrawerManager::apply_sale_cash_flow_in(&mut tx, &drawer.id, cash_amount, change)
                    .await?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            grand_total = %sale.grand_total(),
            lines = sale.items.len(),
            user_id = %caller.user_id(),
            "Sale recorded"
        );

        self.audit.record(
            AuditEvent::new(
                caller.user_id(),
                caller.tenant_id().map(str::to_string),
                AuditAction::CreateSale,
                &sale.id,
            )
            .with_details(json!({ "total": sale.grand_total_cents })),
        );

        Ok(sale)
    }

    /// Gets a sale visible to the caller.
    pub async fn get_sale(&self, caller: &Caller, id: &str) -> ApiResult<Sale> {
        caller.require(Capability::ViewSales)?;
        Ok(self.db.sales().get(&caller.scope(), id).await?)
    }

    /// Lists sales visible to the caller, newest first.
    pub async fn list_sales(&self, caller: &Caller, filter: &SaleFilter) -> ApiResult<Vec<Sale>> {
        caller.require(Capability::ViewSales)?;
        Ok(self.db.sales().list(&caller.scope(), filter).await?)
    }
}

/// Checks everything that can be checked before the first write.
fn validate_sale(request: &NewSaleRequest) -> Result<Vec<ValidatedLine>, ValidationError> {
    validate_line_count(request.items.len())?;
    validate_non_negative_amount("cash_amount_cents", request.cash_amount_cents)?;
    validate_non_negative_amount("bank_amount_cents", request.bank_amount_cents)?;
    validate_text("customer_name", request.customer_name.as_deref())?;
    validate_text("notes", request.notes.as_deref())?;

    request
        .items
        .iter()
        .map(|item| -> Result<ValidatedLine, ValidationError> {
            validate_id("product_id", &item.product_id)?;
            validate_quantity(item.quantity)?;
            if let Some(price) = item.unit_price_cents {
                validate_non_negative_amount("unit_price_cents", price)?;
            }

            Ok(ValidatedLine {
                quantity: item.quantity,
                unit_price: item.unit_price_cents.map(Money::from_cents),
                discount: match item.discount_percent {
                    Some(pct) => validate_percentage("discount_percent", pct)?,
                    None => Percent::zero(),
                },
                vat: match item.vat_percent {
                    Some(pct) => validate_percentage("vat_percent", pct)?,
                    None => Percent::zero(),
                },
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
