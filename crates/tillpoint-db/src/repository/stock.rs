//! # Stock Repository
//!
//! The inventory ledger's persistence: atomic stock deltas, the append-only
//! movement log, and reconciliation of the cached counter against the log.
//!
//! ## Applying a Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN (caller's transaction)                                           │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  UPDATE products                                                        │
//! │     SET current_stock = current_stock + delta      ◄── atomic, no read  │
//! │   WHERE id = ? AND <scope>                             -modify-write    │
//! │     AND (allow_negative OR current_stock + delta >= 0)                  │
//! │  RETURNING current_stock                                                │
//! │    │                                                                    │
//! │    ├── no row ──► product missing?  → ProductNotFound                   │
//! │    │              otherwise         → NegativeStock                     │
//! │    ▼                                                                    │
//! │  INSERT INTO stock_movements (...)                                      │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  COMMIT (caller)                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::product::ProductRepository;
use crate::error::{DbError, DbResult};
use tillpoint_core::ledger;
use tillpoint_core::{CoreError, MovementType, StockMovement, StockReconciliation, TenantScope};

/// Default number of movements returned by a list query.
pub const DEFAULT_MOVEMENT_LIMIT: u32 = 1_000;

/// Hard cap on a movement list query.
pub const MAX_MOVEMENT_LIMIT: u32 = 10_000;

const MOVEMENT_COLUMNS: &str = "id, tenant_id, product_id, quantity, movement_type, reason, \
     reference, branch_id, user_id, created_at";

/// A movement to append.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: String,
    pub quantity: i64,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub branch_id: Option<String>,
    pub user_id: String,
    /// Stamped on the movement row (the caller's tenant).
    pub tenant_id: Option<String>,
}

/// Filters of a movement list query. Unset fields don't filter.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub branch_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl MovementFilter {
    /// Effective limit: default when unset, capped at MAX_MOVEMENT_LIMIT.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
            .clamp(1, MAX_MOVEMENT_LIMIT)
    }
}

/// Result of a movement: the appended row and the product's new stock.
#[derive(Debug, Clone)]
pub struct AppliedMovement {
    pub movement: StockMovement,
    pub new_stock: i64,
}

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Applies a movement in its own transaction.
    pub async fn apply_movement(
        &self,
        scope: &TenantScope,
        new: &NewMovement,
    ) -> DbResult<AppliedMovement> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let applied = Self::apply_movement_in(&mut tx, scope, new).await?;
        tx.commit().await.map_err(DbError::transaction)?;
        Ok(applied)
    }

    /// Applies a movement on a caller-provided transaction.
    ///
    /// The stock delta and the movement insert both run on `conn`; the caller
    /// decides when to commit.
    ///
    /// ## Errors
    /// - `CoreError::ProductNotFound` if the product isn't visible under `scope`
    /// - `CoreError::NegativeStock` for `out`/`adjustment` below zero
    pub async fn apply_movement_in(
        conn: &mut SqliteConnection,
        scope: &TenantScope,
        new: &NewMovement,
    ) -> DbResult<AppliedMovement> {
        let delta = ledger::stock_delta(new.movement_type, new.quantity);
        let allow_negative = ledger::allows_negative_stock(new.movement_type);
        let now = Utc::now();

        debug!(
            product_id = %new.product_id,
            movement_type = new.movement_type.as_str(),
            quantity = new.quantity,
            "Applying stock movement"
        );

        let new_stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
               SET current_stock = current_stock + ?1,
                   updated_at = ?2
             WHERE id = ?3
               AND (?4 IS NULL OR tenant_id = ?4)
               AND (?5 OR current_stock + ?1 >= 0)
            RETURNING current_stock
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(&new.product_id)
        .bind(scope.filter())
        .bind(allow_negative)
        .fetch_optional(&mut *conn)
        .await?;

        let new_stock = match new_stock {
            Some(stock) => stock,
            None => return Err(Self::explain_rejection(conn, scope, new).await),
        };

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            tenant_id: new.tenant_id.clone(),
            product_id: new.product_id.clone(),
            quantity: new.quantity,
            movement_type: new.movement_type,
            reason: new.reason.clone(),
            reference: new.reference.clone(),
            branch_id: new.branch_id.clone(),
            user_id: new.user_id.clone(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, product_id, quantity, movement_type,
                reason, reference, branch_id, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.tenant_id)
        .bind(&movement.product_id)
        .bind(movement.quantity)
        .bind(movement.movement_type)
        .bind(&movement.reason)
        .bind(&movement.reference)
        .bind(&movement.branch_id)
        .bind(&movement.user_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(AppliedMovement {
            movement,
            new_stock,
        })
    }

    /// Works out why the guarded UPDATE matched no row.
    async fn explain_rejection(
        conn: &mut SqliteConnection,
        scope: &TenantScope,
        new: &NewMovement,
    ) -> DbError {
        match ProductRepository::find_in(conn, scope, &new.product_id).await {
            Ok(Some(product)) => {
                match ledger::apply_movement(
                    &product.id,
                    product.current_stock,
                    new.quantity,
                    new.movement_type,
                ) {
                    Err(rule) => rule.into(),
                    Ok(_) => DbError::Internal(format!(
                        "stock update for product {} matched no row",
                        product.id
                    )),
                }
            }
            Ok(None) => CoreError::ProductNotFound(new.product_id.clone()).into(),
            Err(e) => e,
        }
    }

    /// Lists movements visible under `scope`, newest first.
    pub async fn list(
        &self,
        scope: &TenantScope,
        filter: &MovementFilter,
    ) -> DbResult<Vec<StockMovement>> {
        let limit = filter.effective_limit();
        debug!(limit = limit, "Listing stock movements");

        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE (?1 IS NULL OR tenant_id = ?1) \
               AND (?2 IS NULL OR product_id = ?2) \
               AND (?3 IS NULL OR branch_id = ?3) \
               AND (?4 IS NULL OR movement_type = ?4) \
               AND (?5 IS NULL OR created_at >= ?5) \
               AND (?6 IS NULL OR created_at <= ?6) \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?7"
        );

        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(scope.filter())
            .bind(&filter.product_id)
            .bind(&filter.branch_id)
            .bind(filter.movement_type)
            .bind(filter.start)
            .bind(filter.end)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Compares the cached stock of a product with the stock its movements
    /// imply. Reports drift; never corrects it.
    pub async fn reconcile(
        &self,
        scope: &TenantScope,
        product_id: &str,
    ) -> DbResult<StockReconciliation> {
        let mut conn = self.pool.acquire().await?;

        let product = ProductRepository::get_in(&mut conn, scope, product_id).await?;

        let sums: Vec<(MovementType, i64)> = sqlx::query_as(
            r#"
            SELECT movement_type, SUM(quantity)
              FROM stock_movements
             WHERE product_id = ?1
             GROUP BY movement_type
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        let ledger_stock = ledger::derive_stock(sums);
        let report = ledger::reconcile(&product.id, product.current_stock, ledger_stock);

        debug!(
            product_id = %product.id,
            cached = report.cached_stock,
            ledger = report.ledger_stock,
            drift = report.drift,
            "Reconciled stock"
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
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};

    fn scope() -> TenantScope {
        TenantScope::Tenant("t-a".to_string())
    }

    fn movement(product_id: &str, qty: i64, movement_type: MovementType) -> NewMovement {
        NewMovement {
            product_id: product_id.to_string(),
            quantity: qty,
            movement_type,
            reason: None,
            reference: None,
            branch_id: None,
            user_id: "u-1".to_string(),
            tenant_id: Some("t-a".to_string()),
        }
    }

    async fn setup(stock: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(
                &NewProduct {
                    tenant_id: Some("t-a".to_string()),
                    name: "Widget".to_string(),
                    sale_price_cents: 200,
                    initial_stock: stock,
                    ..Default::default()
                },
                "u-1",
            )
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_in_and_out() {
        let (db, id) = setup(10).await;

        let applied = db
            .stock()
            .apply_movement(&scope(), &movement(&id, 5, MovementType::In))
            .await
            .unwrap();
        assert_eq!(applied.new_stock, 15);

        let applied = db
            .stock()
            .apply_movement(&scope(), &movement(&id, 15, MovementType::Out))
            .await
            .unwrap();
        assert_eq!(applied.new_stock, 0);
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_and_nothing_written() {
        let (db, id) = setup(2).await;

        let err = db
            .stock()
            .apply_movement(&scope(), &movement(&id, 3, MovementType::Adjustment))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::NegativeStock {
                current: 2,
                requested: 3,
                ..
            })
        ));

        let product = db.products().get(&scope(), &id).await.unwrap();
        assert_eq!(product.current_stock, 2);

        let movements = db.stock().list(&scope(), &MovementFilter::default()).await.unwrap();
        assert_eq!(movements.len(), 1); // initial stock only
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_out_never_drops_below_zero() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("ledger.db")))
            .await
            .unwrap();
        let id = db
            .products()
            .insert(
                &NewProduct {
                    tenant_id: Some("t-a".to_string()),
                    name: "Widget".to_string(),
                    initial_stock: 10,
                    ..Default::default()
                },
                "u-1",
            )
            .await
            .unwrap()
            .id;

        let handles: Vec<_> = (0..15)
            .map(|_| {
                let stock = db.stock();
                let new = movement(&id, 1, MovementType::Out);
                tokio::spawn(async move { stock.apply_movement(&scope(), &new).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(err) => assert!(matches!(err, DbError::Core(CoreError::NegativeStock { .. }))),
            }
        }
        assert_eq!(applied, 10);

        let product = db.products().get(&scope(), &id).await.unwrap();
        assert_eq!(product.current_stock, 0);

        let report = db.stock().reconcile(&scope(), &id).await.unwrap();
        assert_eq!(report.drift, 0);

        db.close().await;
    }

    #[tokio::test]
    async fn test_sale_may_oversell() {
        let (db, id) = setup(1).await;

        let applied = db
            .stock()
            .apply_movement(&scope(), &movement(&id, 3, MovementType::Sale))
            .await
            .unwrap();
        assert_eq!(applied.new_stock, -2);
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_product() {
        let (db, id) = setup(1).await;

        let err = db
            .stock()
            .apply_movement(&scope(), &movement("missing", 1, MovementType::In))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));

        let other = TenantScope::Tenant("t-b".to_string());
        let err = db
            .stock()
            .apply_movement(&other, &movement(&id, 1, MovementType::In))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, id) = setup(10).await;
        db.stock()
            .apply_movement(&scope(), &movement(&id, 2, MovementType::Sale))
            .await
            .unwrap();
        db.stock()
            .apply_movement(&scope(), &movement(&id, 1, MovementType::Out))
            .await
            .unwrap();

        let all = db.stock().list(&scope(), &MovementFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].movement_type, MovementType::Out); // newest first

        let sales = db
            .stock()
            .list(
                &scope(),
                &MovementFilter {
                    movement_type: Some(MovementType::Sale),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].quantity, 2);

        let limited = db
            .stock()
            .list(
                &scope(),
                &MovementFilter {
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let foreign = db
            .stock()
            .list(&TenantScope::Tenant("t-b".to_string()), &MovementFilter::default())
            .await
            .unwrap();
        assert!(foreign.is_empty());
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(MovementFilter::default().effective_limit(), DEFAULT_MOVEMENT_LIMIT);
        let huge = MovementFilter {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(huge.effective_limit(), MAX_MOVEMENT_LIMIT);
    }

    #[tokio::test]
    async fn test_reconcile_reports_drift() {
        let (db, id) = setup(10).await;
        db.stock()
            .apply_movement(&scope(), &movement(&id, 3, MovementType::Sale))
            .await
            .unwrap();

        let report = db.stock().reconcile(&scope(), &id).await.unwrap();
        assert_eq!(report.cached_stock, 7);
        assert_eq!(report.ledger_stock, 7);
        assert_eq!(report.drift, 0);

        // Simulate an interrupted write that touched only the counter.
        sqlx::query("UPDATE products SET current_stock = current_stock - 2 WHERE id = ?1")
            .bind(&id)
            .execute(db.pool())
            .await
            .unwrap();

        let report = db.stock().reconcile(&scope(), &id).await.unwrap();
        assert_eq!(report.cached_stock, 5);
        assert_eq!(report.ledger_stock, 7);
        assert_eq!(report.drift, -2);
    }
}
