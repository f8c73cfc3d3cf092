//! # Cash Drawer Repository
//!
//! Persistence of till sessions and their manual cash sub-ledger.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open()      INSERT ... status='open'                                   │
//! │              └── partial UNIQUE index (tenant, user) WHERE open         │
//! │                  two concurrent opens: one wins, one DrawerAlreadyOpen  │
//! │                                                                         │
//! │  manual tx   UPDATE ... current_balance  = current_balance  + ?         │
//! │  sale cash   UPDATE ... expected_balance = expected_balance + ?         │
//! │              └── atomic deltas, guarded by status = 'open'              │
//! │                                                                         │
//! │  close()     UPDATE ... SET status='closed' WHERE status='open'         │
//! │              └── exactly one close per session                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drawers are keyed by the caller's own `(tenant_id, user_id)`, not by the
//! read scope: a global administrator has a drawer of its own.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillpoint_core::{
    CashDirection, CashDrawer, CoreError, DrawerStatus, DrawerTransaction, Money,
};

const DRAWER_COLUMNS: &str = "id, tenant_id, user_id, branch_id, opening_balance_cents, \
     current_balance_cents, expected_balance_cents, status, opened_at, closed_at";

/// Identity of a drawer owner.
#[derive(Debug, Clone, Copy)]
pub struct DrawerOwner<'a> {
    pub tenant_id: Option<&'a str>,
    pub user_id: &'a str,
}

/// Repository for cash drawers.
#[derive(Debug, Clone)]
pub struct DrawerRepository {
    pool: SqlitePool,
}

impl DrawerRepository {
    /// Creates a new DrawerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DrawerRepository { pool }
    }

    /// Opens a new drawer session.
    ///
    /// ## Errors
    /// `CoreError::DrawerAlreadyOpen` if the owner already has an open drawer.
    pub async fn open(
        &self,
        owner: DrawerOwner<'_>,
        branch_id: Option<&str>,
        opening_balance: Money,
    ) -> DbResult<CashDrawer> {
        let drawer = CashDrawer {
            id: Uuid::new_v4().to_string(),
            tenant_id: owner.tenant_id.map(str::to_string),
            user_id: owner.user_id.to_string(),
            branch_id: branch_id.map(str::to_string),
            opening_balance_cents: opening_balance.cents(),
            current_balance_cents: opening_balance.cents(),
            expected_balance_cents: opening_balance.cents(),
            status: DrawerStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            transactions: Vec::new(),
        };

        debug!(id = %drawer.id, user_id = %drawer.user_id, "Opening cash drawer");

        let result = sqlx::query(
            r#"
            INSERT INTO cash_drawers (
                id, tenant_id, user_id, branch_id, opening_balance_cents,
                current_balance_cents, expected_balance_cents, status, opened_at, closed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)
            "#,
        )
        .bind(&drawer.id)
        .bind(&drawer.tenant_id)
        .bind(&drawer.user_id)
        .bind(&drawer.branch_id)
        .bind(drawer.opening_balance_cents)
        .bind(drawer.current_balance_cents)
        .bind(drawer.expected_balance_cents)
        .bind(drawer.status)
        .bind(drawer.opened_at)
        .execute(&self.pool)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => Ok(drawer),
            Err(e) if e.is_unique_violation() => Err(CoreError::DrawerAlreadyOpen {
                user_id: owner.user_id.to_string(),
            }
            .into()),
            Err(e) => Err(e),
        }
    }

    /// Finds the owner's open drawer, with its transactions.
    pub async fn find_open(&self, owner: DrawerOwner<'_>) -> DbResult<Option<CashDrawer>> {
        let mut conn = self.pool.acquire().await?;
        let drawer = Self::find_open_in(&mut conn, owner).await?;

        match drawer {
            Some(mut d) => {
                d.transactions = Self::transactions_in(&mut conn, &d.id).await?;
                Ok(Some(d))
            }
            None => Ok(None),
        }
    }

    /// Finds the owner's open drawer on a caller-provided connection.
    ///
    /// Transactions are not loaded.
    pub async fn find_open_in(
        conn: &mut SqliteConnection,
        owner: DrawerOwner<'_>,
    ) -> DbResult<Option<CashDrawer>> {
        let sql = format!(
            "SELECT {DRAWER_COLUMNS} FROM cash_drawers \
             WHERE COALESCE(tenant_id, '') = COALESCE(?1, '') \
               AND user_id = ?2 AND status = 'open'"
        );

        let drawer = sqlx::query_as::<_, CashDrawer>(&sql)
            .bind(owner.tenant_id)
            .bind(owner.user_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(drawer)
    }

    /// Records a manual cash-in/out on an open drawer.
    ///
    /// Moves `current_balance` only. Returns the appended entry and the new
    /// balance.
    pub async fn record_transaction(
        &self,
        drawer_id: &str,
        owner: DrawerOwner<'_>,
        direction: CashDirection,
        amount: Money,
        description: Option<&str>,
    ) -> DbResult<(DrawerTransaction, Money)> {
        let delta = tillpoint_core::ledger::manual_delta(direction, amount);
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let new_balance: i64 = sqlx::query_scalar(
            r#"
            UPDATE cash_drawers
               SET current_balance_cents = current_balance_cents + ?1
             WHERE id = ?2 AND status = 'open'
            RETURNING current_balance_cents
            "#,
        )
        .bind(delta.cents())
        .bind(drawer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NoOpenDrawer {
            user_id: owner.user_id.to_string(),
        })?;

        let entry = DrawerTransaction {
            id: Uuid::new_v4().to_string(),
            drawer_id: drawer_id.to_string(),
            amount_cents: amount.cents(),
            direction,
            description: description.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO cash_drawer_transactions (
                id, drawer_id, amount_cents, direction, description, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.drawer_id)
        .bind(entry.amount_cents)
        .bind(entry.direction)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(drawer_id = %drawer_id, new_balance = new_balance, "Recorded drawer transaction");
        Ok((entry, Money::from_cents(new_balance)))
    }

    /// Adds a sale's net cash to `expected_balance`.
    ///
    /// Runs on the sale's transaction. Returns the new expected balance.
    pub async fn apply_sale_cash_flow_in(
        conn: &mut SqliteConnection,
        drawer_id: &str,
        net_cash: Money,
    ) -> DbResult<Money> {
        let expected: i64 = sqlx::query_scalar(
            r#"
            UPDATE cash_drawers
               SET expected_balance_cents = expected_balance_cents + ?1
             WHERE id = ?2 AND status = 'open'
            RETURNING expected_balance_cents
            "#,
        )
        .bind(net_cash.cents())
        .bind(drawer_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Open cash drawer", drawer_id))?;

        Ok(Money::from_cents(expected))
    }

    /// Closes an open drawer, recording the counted cash as its balance.
    ///
    /// Returns the drawer as it was closed; `expected_balance` is the value
    /// the discrepancy must be measured against.
    pub async fn close(
        &self,
        drawer_id: &str,
        owner: DrawerOwner<'_>,
        actual_balance: Money,
    ) -> DbResult<CashDrawer> {
        let sql = format!(
            "UPDATE cash_drawers \
                SET status = ?1, closed_at = ?2, current_balance_cents = ?3 \
              WHERE id = ?4 AND status = 'open' \
             RETURNING {DRAWER_COLUMNS}"
        );

        let drawer = sqlx::query_as::<_, CashDrawer>(&sql)
            .bind(DrawerStatus::Closed)
            .bind(Utc::now())
            .bind(actual_balance.cents())
            .bind(drawer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::NoOpenDrawer {
                user_id: owner.user_id.to_string(),
            })?;

        debug!(drawer_id = %drawer_id, "Closed cash drawer");
        Ok(drawer)
    }

    async fn transactions_in(
        conn: &mut SqliteConnection,
        drawer_id: &str,
    ) -> DbResult<Vec<DrawerTransaction>> {
        let rows = sqlx::query_as::<_, DrawerTransaction>(
            r#"
            SELECT id, drawer_id, amount_cents, direction, description, created_at
              FROM cash_drawer_transactions
             WHERE drawer_id = ?1
             ORDER BY created_at, rowid
            "#,
        )
        .bind(drawer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn owner() -> DrawerOwner<'static> {
        DrawerOwner {
            tenant_id: Some("t-a"),
            user_id: "u-1",
        }
    }

    #[tokio::test]
    async fn test_open_twice_fails() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let drawer = db
            .drawers()
            .open(owner(), None, Money::from_cents(10_000))
            .await
            .unwrap();
        assert_eq!(drawer.expected_balance_cents, 10_000);
        assert_eq!(drawer.current_balance_cents, 10_000);

        let err = db
            .drawers()
            .open(owner(), None, Money::from_cents(5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::DrawerAlreadyOpen { .. })));

        // Another user of the same tenant is unaffected
        let other = DrawerOwner {
            tenant_id: Some("t-a"),
            user_id: "u-2",
        };
        assert!(db.drawers().open(other, None, Money::zero()).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_then_reopen() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db.drawers().open(owner(), None, Money::from_cents(100)).await.unwrap();
        let closed = db
            .drawers()
            .close(&first.id, owner(), Money::from_cents(110))
            .await
            .unwrap();
        assert_eq!(closed.status, DrawerStatus::Closed);
        assert_eq!(closed.current_balance_cents, 110);
        assert!(closed.closed_at.is_some());

        // Closing again is rejected
        let err = db
            .drawers()
            .close(&first.id, owner(), Money::from_cents(110))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NoOpenDrawer { .. })));

        let second = db.drawers().open(owner(), None, Money::from_cents(50)).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(db.drawers().find_open(owner()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_manual_transactions_move_current_balance_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let drawer = db.drawers().open(owner(), None, Money::from_cents(1_000)).await.unwrap();

        let (_, balance) = db
            .drawers()
            .record_transaction(&drawer.id, owner(), CashDirection::In, Money::from_cents(500), Some("float"))
            .await
            .unwrap();
        assert_eq!(balance.cents(), 1_500);

        let (_, balance) = db
            .drawers()
            .record_transaction(&drawer.id, owner(), CashDirection::Out, Money::from_cents(200), None)
            .await
            .unwrap();
        assert_eq!(balance.cents(), 1_300);

        let reloaded = db.drawers().find_open(owner()).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance_cents, 1_300);
        assert_eq!(reloaded.expected_balance_cents, 1_000);
        assert_eq!(reloaded.transactions.len(), 2);
        assert_eq!(reloaded.transactions[0].description.as_deref(), Some("float"));
    }

    #[tokio::test]
    async fn test_sale_cash_flow_moves_expected_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let drawer = db.drawers().open(owner(), None, Money::from_cents(1_000)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let expected =
            DrawerRepository::apply_sale_cash_flow_in(&mut tx, &drawer.id, Money::from_cents(480))
                .await
                .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(expected.cents(), 1_480);
        let reloaded = db.drawers().find_open(owner()).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance_cents, 1_000);
    }

    #[tokio::test]
    async fn test_global_admin_has_own_drawer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let admin = DrawerOwner {
            tenant_id: None,
            user_id: "root",
        };

        db.drawers().open(admin, None, Money::zero()).await.unwrap();
        assert!(db.drawers().open(admin, None, Money::zero()).await.is_err());
        assert!(db.drawers().find_open(owner()).await.unwrap().is_none());
    }
}
