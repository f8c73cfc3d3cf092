//! # Cash Drawer Manager
//!
//! Till sessions of a user: open, manual cash in/out, sale cash flow, close
//! with a discrepancy report.
//!
//! ## Balances
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         opening_balance                                 │
//! │                        ┌───────┴────────┐                               │
//! │                        ▼                ▼                               │
//! │              current_balance     expected_balance                       │
//! │              ± manual in/out     + sale cash - change                   │
//! │              = counted cash      (what should be in the till)           │
//! │                 on close                                                │
//! │                                                                         │
//! │  close(actual): discrepancy = actual - expected                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::ApiResult;
use crate::services::audit::AuditSink;
use tillpoint_core::ledger;
use tillpoint_core::validation::{
    validate_non_negative_amount, validate_positive_amount, validate_text,
};
use tillpoint_core::{
    AuditAction, AuditEvent, Caller, Capability, CashDirection, CashDrawer, DrawerCloseReport,
    DrawerTransaction, Money,
};
use tillpoint_db::{Database, DbResult, DrawerOwner, DrawerRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct OpenDrawerRequest {
    pub opening_balance_cents: i64,
    pub branch_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrawerTransactionRequest {
    pub amount_cents: i64,
    pub transaction_type: CashDirection,
    pub description: Option<String>,
}

/// Result of a manual cash-in/out.
#[derive(Debug, Clone, Serialize)]
pub struct DrawerTransactionReceipt {
    pub drawer_id: String,
    pub transaction: DrawerTransaction,
    pub new_balance_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseDrawerRequest {
    pub actual_balance_cents: i64,
}

/// The cash drawer service.
#[derive(Clone)]
pub struct CashDrawerManager {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl CashDrawerManager {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        CashDrawerManager { db, audit }
    }

    /// Drawer identity of a caller: its own tenant and user.
    pub fn owner(caller: &Caller) -> DrawerOwner<'_> {
        DrawerOwner {
            tenant_id: caller.tenant_id(),
            user_id: caller.user_id(),
        }
    }

    /// Opens a drawer for the caller.
    ///
    /// ## Errors
    /// `DrawerAlreadyOpen` if the caller already has one open.
    pub async fn open(&self, caller: &Caller, request: OpenDrawerRequest) -> ApiResult<CashDrawer> {
        caller.require(Capability::OperateDrawer)?;
        validate_non_negative_amount("opening_balance_cents", request.opening_balance_cents)?;

        let branch_id = request.branch_id.as_deref().or(caller.branch_id());
        let drawer = self
            .db
            .drawers()
            .open(
                Self::owner(caller),
                branch_id,
                Money::from_cents(request.opening_balance_cents),
            )
            .await?;

        info!(
            drawer_id = %drawer.id,
            user_id = %caller.user_id(),
            opening_balance = %drawer.expected_balance(),
            "Cash drawer opened"
        );

        self.audit.record(AuditEvent::new(
            caller.user_id(),
            caller.tenant_id().map(str::to_string),
            AuditAction::OpenDrawer,
            &drawer.id,
        ));

        Ok(drawer)
    }

    /// The caller's open drawer, with its manual transactions.
    pub async fn current(&self, caller: &Caller) -> ApiResult<CashDrawer> {
        caller.require(Capability::OperateDrawer)?;
        let drawer = self.db.drawers().find_open(Self::owner(caller)).await?;
        Ok(ledger::ensure_open(drawer, caller.user_id())?)
    }

    /// Records a manual cash-in/out on the caller's open drawer.
    pub async fn record_transaction(
        &self,
        caller: &Caller,
        request: DrawerTransactionRequest,
    ) -> ApiResult<DrawerTransactionReceipt> {
        caller.require(Capability::OperateDrawer)?;
        validate_positive_amount("amount_cents", request.amount_cents)?;
        validate_text("description", request.description.as_deref())?;

        let owner = Self::owner(caller);
        let open = self.db.drawers().find_open(owner).await?;
        let drawer = ledger::ensure_open(open, caller.user_id())?;

        let (transaction, new_balance) = self
            .db
            .drawers()
            .record_transaction(
                &drawer.id,
                owner,
                request.transaction_type,
                Money::from_cents(request.amount_cents),
                request.description.as_deref(),
            )
            .await?;

        info!(
            drawer_id = %drawer.id,
            direction = ?request.transaction_type,
            amount = request.amount_cents,
            new_balance = new_balance.cents(),
            "Drawer transaction recorded"
        );

        Ok(DrawerTransactionReceipt {
            drawer_id: drawer.id,
            transaction,
            new_balance_cents: new_balance.cents(),
        })
    }

    /// Adds a sale's net cash (`cash - change`) to the drawer's expected
    /// balance, on the sale transaction.
    pub async fn apply_sale_cash_flow_in(
        conn: &mut SqliteConnection,
        drawer_id: &str,
        cash_amount: Money,
        change_amount: Money,
    ) -> DbResult<Money> {
        let net = ledger::sale_cash_flow(cash_amount, change_amount);
        DrawerRepository::apply_sale_cash_flow_in(conn, drawer_id, net).await
    }

    /// Closes the caller's open drawer against the counted cash.
    pub async fn close(
        &self,
        caller: &Caller,
        request: CloseDrawerRequest,
    ) -> ApiResult<DrawerCloseReport> {
        caller.require(Capability::OperateDrawer)?;
        validate_non_negative_amount("actual_balance_cents", request.actual_balance_cents)?;

        let owner = Self::owner(caller);
        let open = self.db.drawers().find_open(owner).await?;
        let drawer = ledger::ensure_open(open, caller.user_id())?;

        let actual = Money::from_cents(request.actual_balance_cents);
        let closed = self.db.drawers().close(&drawer.id, owner, actual).await?;
        let report = ledger::close_report(&closed, actual);

        info!(
            drawer_id = %report.drawer_id,
            expected = report.expected_balance_cents,
            actual = report.actual_balance_cents,
            discrepancy = report.discrepancy_cents,
            "Cash drawer closed"
        );

        self.audit.record(
            AuditEvent::new(
                caller.user_id(),
                caller.tenant_id().map(str::to_string),
                AuditAction::CloseDrawer,
                &report.drawer_id,
            )
            .with_details(json!({ "discrepancy": report.discrepancy_cents })),
        );

        Ok(report)
    }
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
    use tillpoint_db::DbConfig;

    fn cashier() -> Caller {
        Caller::new("u-1", "alice", Role::Cashier, Some("t-a".into()), Some("b-1".into())).unwrap()
    }

    async fn setup() -> (CashDrawerManager, Arc<MemoryAuditSink>, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let audit = Arc::new(MemoryAuditSink::new());
        (CashDrawerManager::new(db.clone(), audit.clone()), audit, db)
    }

    fn open_request(cents: i64) -> OpenDrawerRequest {
        OpenDrawerRequest {
            opening_balance_cents: cents,
            branch_id: None,
        }
    }

    #[tokio::test]
    async fn test_open_is_exclusive_per_user() {
        let (drawers, audit, _db) = setup().await;

        let drawer = drawers.open(&cashier(), open_request(10_000)).await.unwrap();
        assert_eq!(drawer.branch_id.as_deref(), Some("b-1"));

        let err = drawers.open(&cashier(), open_request(5_000)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DrawerAlreadyOpen);

        assert_eq!(audit.events().len(), 1);
        assert_eq!(audit.events()[0].action, AuditAction::OpenDrawer);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_leave_one_drawer() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("ledger.db")))
            .await
            .unwrap();
        let audit = Arc::new(MemoryAuditSink::new());
        let drawers = CashDrawerManager::new(db.clone(), audit.clone());

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let drawers = drawers.clone();
                tokio::spawn(async move { drawers.open(&cashier(), open_request(i * 100)).await })
            })
            .collect();

        let mut opened = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(err) => assert_eq!(err.code, ErrorCode::DrawerAlreadyOpen),
            }
        }
        assert_eq!(opened, 1);

        let open_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cash_drawers WHERE status = 'open'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(open_count, 1);
        assert_eq!(audit.events().len(), 1);

        db.close().await;
    }

    #[tokio::test]
    async fn test_current_without_drawer() {
        let (drawers, _audit, _db) = setup().await;
        let err = drawers.current(&cashier()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_manual_transactions() {
        let (drawers, _audit, _db) = setup().await;
        drawers.open(&cashier(), open_request(1_000)).await.unwrap();

        let receipt = drawers
            .record_transaction(
                &cashier(),
                DrawerTransactionRequest {
                    amount_cents: 250,
                    transaction_type: CashDirection::Out,
                    description: Some("supplier".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.new_balance_cents, 750);

        let err = drawers
            .record_transaction(
                &cashier(),
                DrawerTransactionRequest {
                    amount_cents: 0,
                    transaction_type: CashDirection::In,
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let current = drawers.current(&cashier()).await.unwrap();
        assert_eq!(current.current_balance_cents, 750);
        assert_eq!(current.expected_balance_cents, 1_000);
        assert_eq!(current.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_close_reports_discrepancy() {
        let (drawers, audit, db) = setup().await;
        let drawer = drawers.open(&cashier(), open_request(10_000)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        CashDrawerManager::apply_sale_cash_flow_in(
            &mut tx,
            &drawer.id,
            Money::from_cents(2_000),
            Money::from_cents(0),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let report = drawers
            .close(
                &cashier(),
                CloseDrawerRequest {
                    actual_balance_cents: 13_000,
                },
            )
            .await
            .unwrap();

        assert_eq!(report.expected_balance_cents, 12_000);
        assert_eq!(report.actual_balance_cents, 13_000);
        assert_eq!(report.discrepancy_cents, 1_000);

        let last = audit.events().pop().unwrap();
        assert_eq!(last.action, AuditAction::CloseDrawer);
        assert_eq!(last.details.unwrap()["discrepancy"], 1_000);

        // A new session can start once the previous one is closed.
        assert!(drawers.open(&cashier(), open_request(0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_without_drawer() {
        let (drawers, _audit, _db) = setup().await;
        let err = drawers
            .close(
                &cashier(),
                CloseDrawerRequest {
                    actual_balance_cents: 0,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
