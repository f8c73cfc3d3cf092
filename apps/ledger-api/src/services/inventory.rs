//! # Inventory Ledger
//!
//! Every stock change goes through here as an append-only movement plus an
//! atomic delta on the product's cached counter.
//!
//! ## Movement Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/stock/movements                                              │
//! │    └── record_movement()          AdjustStock required                  │
//! │        in / out / adjustment      own transaction, audited              │
//! │        out/adjustment below zero  → NegativeStock                       │
//! │                                                                         │
//! │  SaleProcessor                                                          │
//! │    └── apply_sale_movement_in()   on the sale's transaction             │
//! │        sale                       may oversell, reference = receipt     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::ApiResult;
use crate::services::audit::AuditSink;
use tillpoint_core::validation::{validate_id, validate_movement_quantity, validate_text};
use tillpoint_core::{
    AuditAction, AuditEvent, Caller, Capability, MovementType, Product, StockMovement,
    StockReconciliation, ValidationError,
};
use tillpoint_db::{AppliedMovement, Database, DbResult, MovementFilter, NewMovement, StockRepository};

/// Reason stamped on movements created by sales.
pub const SALE_REASON: &str = "sale";

/// Default and maximum page size of product listings.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 500;
pub const MAX_PRODUCT_LIMIT: u32 = 10_000;

/// A direct stock movement.
#[derive(Debug, Clone, Deserialize)]
pub struct MovementRequest {
    pub product_id: String,
    pub quantity: i64,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub branch_id: Option<String>,
}

/// A recorded movement with the product's resulting stock.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedMovement {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub new_stock: i64,
}

/// The inventory ledger service.
#[derive(Clone)]
pub struct InventoryLedger {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl InventoryLedger {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        InventoryLedger { db, audit }
    }

    /// Looks up a product visible to the caller.
    pub async fn lookup_product(&self, caller: &Caller, product_id: &str) -> ApiResult<Product> {
        caller.require(Capability::ViewStock)?;
        Ok(self.db.products().get(&caller.scope(), product_id).await?)
    }

    /// Lists products visible to the caller, ordered by name.
    pub async fn list_products(&self, caller: &Caller, limit: Option<u32>) -> ApiResult<Vec<Product>> {
        caller.require(Capability::ViewStock)?;
        let limit = limit
            .unwrap_or(DEFAULT_PRODUCT_LIMIT)
            .clamp(1, MAX_PRODUCT_LIMIT);
        Ok(self.db.products().list(&caller.scope(), limit).await?)
    }

    /// Records a direct `in`/`out`/`adjustment` movement.
    pub async fn record_movement(
        &self,
        caller: &Caller,
        request: MovementRequest,
    ) -> ApiResult<RecordedMovement> {
        caller.require(Capability::AdjustStock)?;
        validate_movement(&request)?;

        let scope = caller.scope();
        let product = self.db.products().get(&scope, &request.product_id).await?;

        let new = NewMovement {
            product_id: product.id.clone(),
            quantity: request.quantity,
            movement_type: request.movement_type,
            reason: request.reason,
            reference: request.reference,
            branch_id: request.branch_id.or_else(|| caller.branch_id().map(str::to_string)),
            user_id: caller.user_id().to_string(),
            tenant_id: product.tenant_id.clone(),
        };

        let applied = self.db.stock().apply_movement(&scope, &new).await?;

        info!(
            product_id = %product.id,
            movement_type = new.movement_type.as_str(),
            quantity = new.quantity,
            new_stock = applied.new_stock,
            user_id = %caller.user_id(),
            "Stock movement recorded"
        );

        self.audit.record(
            AuditEvent::new(
                caller.user_id(),
                caller.tenant_id().map(str::to_string),
                AuditAction::StockMovement,
                &applied.movement.id,
            )
            .with_details(json!({
                "type": new.movement_type.as_str(),
                "qty": new.quantity,
                "product_id": product.id,
            })),
        );

        Ok(RecordedMovement {
            movement: applied.movement,
            new_stock: applied.new_stock,
        })
    }

    /// Applies the `sale` movement of one sale line on the sale transaction.
    pub async fn apply_sale_movement_in(
        conn: &mut SqliteConnection,
        caller: &Caller,
        product: &Product,
        quantity: i64,
        receipt_number: &str,
    ) -> DbResult<AppliedMovement> {
        let new = NewMovement {
            product_id: product.id.clone(),
            quantity,
            movement_type: MovementType::Sale,
            reason: Some(SALE_REASON.to_string()),
            reference: Some(receipt_number.to_string()),
            branch_id: caller.branch_id().map(str::to_string),
            user_id: caller.user_id().to_string(),
            tenant_id: product.tenant_id.clone(),
        };

        StockRepository::apply_movement_in(conn, &caller.scope(), &new).await
    }

    /// Lists movements visible to the caller, newest first.
    pub async fn list_movements(
        &self,
        caller: &Caller,
        filter: &MovementFilter,
    ) -> ApiResult<Vec<StockMovement>> {
        caller.require(Capability::ViewStock)?;
        Ok(self.db.stock().list(&caller.scope(), filter).await?)
    }

    /// Reports drift between a product's cached stock and its movements.
    pub async fn reconcile(
        &self,
        caller: &Caller,
        product_id: &str,
    ) -> ApiResult<StockReconciliation> {
        caller.require(Capability::AdjustStock)?;
        let report = self.db.stock().reconcile(&caller.scope(), product_id).await?;

        if report.drift != 0 {
            tracing::warn!(
                product_id = %report.product_id,
                cached = report.cached_stock,
                ledger = report.ledger_stock,
                drift = report.drift,
                "Stock counter drifted from the movement log"
            );
        }

        Ok(report)
    }
}

fn validate_movement(request: &MovementRequest) -> Result<(), ValidationError> {
    validate_id("product_id", &request.product_id)?;
    validate_movement_quantity(request.quantity)?;
    validate_text("reason", request.reason.as_deref())?;
    validate_text("reference", request.reference.as_deref())?;

    if request.movement_type == MovementType::Sale {
        return Err(ValidationError::NotAllowed {
            field: "movement_type".to_string(),
            allowed: [MovementType::In, MovementType::Out, MovementType::Adjustment]
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
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
    use crate::error::ErrorCode;
    use crate::services::audit::MemoryAuditSink;
    use tillpoint_core::Role;
    use tillpoint_db::{DbConfig, NewProduct};

    fn caller(role: Role) -> Caller {
        Caller::new("u-1", "alice", role, Some("t-a".into()), Some("b-1".into())).unwrap()
    }

    fn request(product_id: &str, qty: i64, movement_type: MovementType) -> MovementRequest {
        MovementRequest {
            product_id: product_id.to_string(),
            quantity: qty,
            movement_type,
            reason: Some("delivery".to_string()),
            reference: None,
            branch_id: None,
        }
    }

    async fn setup(stock: i64) -> (InventoryLedger, Arc<MemoryAuditSink>, Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(
                &NewProduct {
                    tenant_id: Some("t-a".into()),
                    name: "Widget".into(),
                    sale_price_cents: 200,
                    initial_stock: stock,
                    ..Default::default()
                },
                "seed",
            )
            .await
            .unwrap();
        let audit = Arc::new(MemoryAuditSink::new());
        let ledger = InventoryLedger::new(db.clone(), audit.clone());
        (ledger, audit, db, product.id)
    }

    #[tokio::test]
    async fn test_product_reads_are_scoped() {
        let (ledger, _audit, _db, id) = setup(3).await;

        let listed = ledger.list_products(&caller(Role::Cashier), None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);

        let stranger = Caller::new("u-9", "bob", Role::Admin, Some("t-b".into()), None).unwrap();
        assert!(ledger.list_products(&stranger, Some(10)).await.unwrap().is_empty());

        let err = ledger.lookup_product(&stranger, &id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_record_movement_updates_stock_and_audits() {
        let (ledger, audit, _db, id) = setup(10).await;

        let recorded = ledger
            .record_movement(&caller(Role::Manager), request(&id, 5, MovementType::In))
            .await
            .unwrap();

        assert_eq!(recorded.new_stock, 15);
        assert_eq!(recorded.movement.branch_id.as_deref(), Some("b-1"));
        assert_eq!(recorded.movement.tenant_id.as_deref(), Some("t-a"));

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::StockMovement);
        assert_eq!(events[0].entity_id, recorded.movement.id);
        assert_ne!(events[0].entity_id, id);
        assert_eq!(events[0].details.as_ref().unwrap()["type"], "in");
        assert_eq!(events[0].details.as_ref().unwrap()["qty"], 5);
        assert_eq!(events[0].details.as_ref().unwrap()["product_id"], id.as_str());
    }

    #[tokio::test]
    async fn test_oversized_movement_is_rejected() {
        let (ledger, audit, db, id) = setup(10).await;

        let err = ledger
            .record_movement(
                &caller(Role::Manager),
                request(&id, tillpoint_core::MAX_MOVEMENT_QUANTITY + 1, MovementType::In),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let product = db.products().get(&caller(Role::Manager).scope(), &id).await.unwrap();
        assert_eq!(product.current_stock, 10);
        assert!(audit.events().is_empty());
    }

    #[tokio::test]
    async fn test_cashier_cannot_adjust_stock() {
        let (ledger, audit, _db, id) = setup(10).await;

        let err = ledger
            .record_movement(&caller(Role::Cashier), request(&id, 1, MovementType::Out))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(audit.events().is_empty());
    }

    #[tokio::test]
    async fn test_direct_sale_movement_rejected() {
        let (ledger, _audit, _db, id) = setup(10).await;

        let err = ledger
            .record_movement(&caller(Role::Admin), request(&id, 1, MovementType::Sale))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_negative_stock_guard() {
        let (ledger, audit, db, id) = setup(2).await;

        let err = ledger
            .record_movement(&caller(Role::Manager), request(&id, 3, MovementType::Out))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NegativeStock);

        let product = db.products().get(&caller(Role::Manager).scope(), &id).await.unwrap();
        assert_eq!(product.current_stock, 2);
        assert!(audit.events().is_empty());
    }

    #[tokio::test]
    async fn test_other_tenant_product_not_found() {
        let (ledger, _audit, _db, id) = setup(10).await;
        let stranger =
            Caller::new("u-9", "mallory", Role::Admin, Some("t-b".into()), None).unwrap();

        let err = ledger
            .record_movement(&stranger, request(&id, 1, MovementType::In))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let movements = ledger
            .list_movements(&stranger, &MovementFilter::default())
            .await
            .unwrap();
        assert!(movements.is_empty());
    }

    #[tokio::test]
    async fn test_sale_movement_may_oversell() {
        let (_ledger, _audit, db, id) = setup(1).await;
        let cashier = caller(Role::Cashier);
        let product = db.products().get(&cashier.scope(), &id).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let applied = InventoryLedger::apply_sale_movement_in(
            &mut tx,
            &cashier,
            &product,
            3,
            "RCP-20240315-0001",
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(applied.new_stock, -2);
        assert_eq!(applied.movement.reason.as_deref(), Some(SALE_REASON));
        assert_eq!(applied.movement.reference.as_deref(), Some("RCP-20240315-0001"));
    }

    #[tokio::test]
    async fn test_reconcile_requires_adjust_capability() {
        let (ledger, _audit, _db, id) = setup(4).await;

        let err = ledger.reconcile(&caller(Role::Cashier), &id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let report = ledger.reconcile(&caller(Role::Admin), &id).await.unwrap();
        assert_eq!(report.cached_stock, 4);
        assert_eq!(report.drift, 0);
    }
}
