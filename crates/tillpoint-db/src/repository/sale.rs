//! # Sale Repository
//!
//! Persistence of immutable sales and their lines.
//!
//! ## Snapshot Pattern
//! Each sale line stores the product name, price, discount and VAT as they
//! were at the moment of sale, plus the computed figures. Later product
//! changes never alter a recorded sale.
//!
//! There is no update or delete: a sale is written once, inside the sale
//! transaction, and only read afterwards.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tillpoint_core::{CoreError, Sale, SaleItem, TenantScope};

/// Default number of sales returned by a list query.
pub const DEFAULT_SALE_LIMIT: u32 = 100;

/// Hard cap on a sale list query.
pub const MAX_SALE_LIMIT: u32 = 1_000;

const SALE_COLUMNS: &str = "id, tenant_id, receipt_number, subtotal_cents, total_discount_cents, \
     total_vat_cents, grand_total_cents, payment_method, cash_amount_cents, bank_amount_cents, \
     change_amount_cents, customer_name, notes, user_id, branch_id, cash_drawer_id, created_at";

/// Filters of a sale list query. Unset fields don't filter.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub branch_id: Option<String>,
    pub user_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl SaleFilter {
    /// Effective limit: default when unset, capped at MAX_SALE_LIMIT.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_SALE_LIMIT).clamp(1, MAX_SALE_LIMIT)
    }
}

/// Repository for sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale and its items on the sale transaction.
    pub async fn insert_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, receipt_number = %sale.receipt_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, receipt_number,
                subtotal_cents, total_discount_cents, total_vat_cents, grand_total_cents,
                payment_method, cash_amount_cents, bank_amount_cents, change_amount_cents,
                customer_name, notes, user_id, branch_id, cash_drawer_id, created_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.receipt_number)
        .bind(sale.subtotal_cents)
        .bind(sale.total_discount_cents)
        .bind(sale.total_vat_cents)
        .bind(sale.grand_total_cents)
        .bind(sale.payment_method)
        .bind(sale.cash_amount_cents)
        .bind(sale.bank_amount_cents)
        .bind(sale.change_amount_cents)
        .bind(&sale.customer_name)
        .bind(&sale.notes)
        .bind(&sale.user_id)
        .bind(&sale.branch_id)
        .bind(&sale.cash_drawer_id)
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await?;

        for (line_no, item) in sale.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, product_name, quantity, unit_price_cents,
                    discount_bps, vat_bps, subtotal_cents, discount_cents,
                    vat_amount_cents, total_cents, line_no
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_bps)
            .bind(item.vat_bps)
            .bind(item.subtotal_cents)
            .bind(item.discount_cents)
            .bind(item.vat_amount_cents)
            .bind(item.total_cents)
            .bind(line_no as i64)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Gets a sale visible under `scope`, with its items.
    ///
    /// ## Errors
    /// `CoreError::SaleNotFound` if absent or owned by another tenant.
    pub async fn get(&self, scope: &TenantScope, id: &str) -> DbResult<Sale> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
        );

        let mut sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(scope.filter())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        sale.items = Self::items_in(&mut conn, &sale.id).await?;
        Ok(sale)
    }

    /// Lists sales visible under `scope`, newest first, with their items.
    pub async fn list(&self, scope: &TenantScope, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let limit = filter.effective_limit();
        debug!(limit = limit, "Listing sales");

        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE (?1 IS NULL OR tenant_id = ?1) \
               AND (?2 IS NULL OR branch_id = ?2) \
               AND (?3 IS NULL OR user_id = ?3) \
               AND (?4 IS NULL OR created_at >= ?4) \
               AND (?5 IS NULL OR created_at <= ?5) \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?6"
        );

        let mut sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(scope.filter())
            .bind(&filter.branch_id)
            .bind(&filter.user_id)
            .bind(filter.start)
            .bind(filter.end)
            .bind(i64::from(limit))
            .fetch_all(&mut *conn)
            .await?;

        for sale in &mut sales {
            sale.items = Self::items_in(&mut conn, &sale.id).await?;
        }

        Ok(sales)
    }

    /// Counts sales visible under `scope`.
    pub async fn count(&self, scope: &TenantScope) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE (?1 IS NULL OR tenant_id = ?1)")
                .bind(scope.filter())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn items_in(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, product_name, quantity, unit_price_cents,
                   discount_bps, vat_bps, subtotal_cents, discount_cents,
                   vat_amount_cents, total_cents
              FROM sale_items
             WHERE sale_id = ?1
             ORDER BY line_no
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use tillpoint_core::PaymentMethod;
    use uuid::Uuid;

    fn sale(tenant: &str, receipt: &str, product_id: &str) -> Sale {
        let id = Uuid::new_v4().to_string();
        Sale {
            id: id.clone(),
            tenant_id: Some(tenant.to_string()),
            receipt_number: receipt.to_string(),
            subtotal_cents: 400,
            total_discount_cents: 0,
            total_vat_cents: 80,
            grand_total_cents: 480,
            payment_method: PaymentMethod::Cash,
            cash_amount_cents: 500,
            bank_amount_cents: 0,
            change_amount_cents: 20,
            customer_name: None,
            notes: None,
            user_id: "u-1".to_string(),
            branch_id: Some("b-1".to_string()),
            cash_drawer_id: None,
            created_at: Utc::now(),
            items: vec![SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: id,
                product_id: product_id.to_string(),
                product_name: Some("Widget".to_string()),
                quantity: 2,
                unit_price_cents: 200,
                discount_bps: 0,
                vat_bps: 2000,
                subtotal_cents: 400,
                discount_cents: 0,
                vat_amount_cents: 80,
                total_cents: 480,
            }],
        }
    }

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(
                &NewProduct {
                    tenant_id: Some("t-a".to_string()),
                    name: "Widget".to_string(),
                    sale_price_cents: 200,
                    ..Default::default()
                },
                "u-1",
            )
            .await
            .unwrap();
        (db, product.id)
    }

    async fn insert(db: &Database, sale: &Sale) -> DbResult<()> {
        let mut tx = db.begin().await?;
        SaleRepository::insert_in(&mut tx, sale).await?;
        tx.commit().await.map_err(DbError::transaction)
    }

    #[tokio::test]
    async fn test_insert_and_get_with_items() {
        let (db, product_id) = setup().await;
        let s = sale("t-a", "RCP-20240315-0001", &product_id);
        insert(&db, &s).await.unwrap();

        let scope = TenantScope::Tenant("t-a".to_string());
        let fetched = db.sales().get(&scope, &s.id).await.unwrap();
        assert_eq!(fetched.grand_total_cents, 480);
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(fetched.items[0].vat_bps, 2000);
        assert_eq!(fetched.items[0].product_name.as_deref(), Some("Widget"));

        let other = TenantScope::Tenant("t-b".to_string());
        let err = db.sales().get(&other, &s.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_receipt_number_unique_per_tenant() {
        let (db, product_id) = setup().await;
        insert(&db, &sale("t-a", "RCP-20240315-0001", &product_id)).await.unwrap();

        let err = insert(&db, &sale("t-a", "RCP-20240315-0001", &product_id))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // Same number in another tenant is fine
        insert(&db, &sale("t-b", "RCP-20240315-0001", &product_id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_and_scope() {
        let (db, product_id) = setup().await;
        let mut s1 = sale("t-a", "RCP-20240315-0001", &product_id);
        s1.user_id = "u-2".to_string();
        insert(&db, &s1).await.unwrap();
        insert(&db, &sale("t-a", "RCP-20240315-0002", &product_id)).await.unwrap();
        insert(&db, &sale("t-b", "RCP-20240315-0001", &product_id)).await.unwrap();

        let a = TenantScope::Tenant("t-a".to_string());
        let all = db.sales().list(&a, &SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].receipt_number, "RCP-20240315-0002");
        assert_eq!(all[0].items.len(), 1);

        let by_user = db
            .sales()
            .list(
                &a,
                &SaleFilter {
                    user_id: Some("u-2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].id, s1.id);

        let future = db
            .sales()
            .list(
                &a,
                &SaleFilter {
                    start: Some(Utc::now() + chrono::Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(future.is_empty());

        assert_eq!(db.sales().count(&TenantScope::Global).await.unwrap(), 3);
    }
}
