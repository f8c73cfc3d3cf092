//! # Product Repository
//!
//! Scoped product reads, and the insert used by seeding and tests.
//!
//! Product CRUD belongs to the catalogue; the ledger only needs to look a
//! product up under the caller's tenant scope and to move its stock (see
//! [`super::stock`]).
//!
//! ## Scoped Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SELECT ... FROM products                                               │
//! │  WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)                       │
//! │                      └──────────────┬─────────────┘                     │
//! │                    TenantScope::filter(): None for Global               │
//! │                                                                         │
//! │  A product of another tenant is indistinguishable from a missing one.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillpoint_core::{CoreError, MovementType, Product, TenantScope};

const PRODUCT_COLUMNS: &str = "id, tenant_id, name, barcode, sale_price_cents, purchase_price_cents, \
     current_stock, branch_id, created_at, updated_at";

/// Fields of a product to create.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub tenant_id: Option<String>,
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price_cents: i64,
    pub purchase_price_cents: Option<i64>,
    pub initial_stock: i64,
    pub branch_id: Option<String>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product visible under `scope`.
    ///
    /// ## Errors
    /// `CoreError::ProductNotFound` if absent or owned by another tenant.
    pub async fn get(&self, scope: &TenantScope, id: &str) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, scope, id).await
    }

    /// Same as [`Self::get`] on a caller-provided connection or transaction.
    pub async fn get_in(
        conn: &mut SqliteConnection,
        scope: &TenantScope,
        id: &str,
    ) -> DbResult<Product> {
        Self::find_in(conn, scope, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub(crate) async fn find_in(
        conn: &mut SqliteConnection,
        scope: &TenantScope,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(scope.filter())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Lists products visible under `scope`, ordered by name.
    pub async fn list(&self, scope: &TenantScope, limit: u32) -> DbResult<Vec<Product>> {
        debug!(limit = limit, "Listing products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE (?1 IS NULL OR tenant_id = ?1) \
             ORDER BY name, id LIMIT ?2"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(scope.filter())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a product.
    ///
    /// A positive initial stock is recorded as an `in` movement with reason
    /// "initial stock" in the same transaction, so the movement log and the
    /// cached counter agree from the start.
    pub async fn insert(&self, new: &NewProduct, user_id: &str) -> DbResult<Product> {
        if new.initial_stock < 0 {
            return Err(CoreError::Validation(
                tillpoint_core::ValidationError::MustNotBeNegative {
                    field: "initial_stock".to_string(),
                },
            )
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            tenant_id: new.tenant_id.clone(),
            name: new.name.clone(),
            barcode: new.barcode.clone(),
            sale_price_cents: new.sale_price_cents,
            purchase_price_cents: new.purchase_price_cents,
            current_stock: new.initial_stock,
            branch_id: new.branch_id.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, barcode, sale_price_cents, purchase_price_cents,
                current_stock, branch_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.sale_price_cents)
        .bind(product.purchase_price_cents)
        .bind(product.current_stock)
        .bind(&product.branch_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        if product.current_stock > 0 {
            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    id, tenant_id, product_id, quantity, movement_type,
                    reason, reference, branch_id, user_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'initial stock', NULL, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&product.tenant_id)
            .bind(&product.id)
            .bind(product.current_stock)
            .bind(MovementType::In)
            .bind(&product.branch_id)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        Ok(product)
    }

    /// Counts products visible under `scope`.
    pub async fn count(&self, scope: &TenantScope) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE (?1 IS NULL OR tenant_id = ?1)")
                .bind(scope.filter())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use tillpoint_core::{CoreError, TenantScope};

    use super::NewProduct;
    use crate::error::DbError;

    fn widget(tenant: &str, stock: i64) -> NewProduct {
        NewProduct {
            tenant_id: Some(tenant.to_string()),
            name: "Widget".to_string(),
            sale_price_cents: 200,
            initial_stock: stock,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = TenantScope::Tenant("t-a".to_string());

        let created = db.products().insert(&widget("t-a", 10), "u-1").await.unwrap();
        let fetched = db.products().get(&scope, &created.id).await.unwrap();

        assert_eq!(fetched.name, "Widget");
        assert_eq!(fetched.current_stock, 10);
        assert_eq!(fetched.sale_price_cents, 200);
    }

    #[tokio::test]
    async fn test_initial_stock_is_recorded_as_movement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.products().insert(&widget("t-a", 10), "u-1").await.unwrap();

        let (qty, reason): (i64, String) = sqlx::query_as(
            "SELECT quantity, reason FROM stock_movements WHERE product_id = ?1 AND movement_type = 'in'",
        )
        .bind(&created.id)
        .fetch_one(db.pool())
        .await
        .unwrap();

        assert_eq!(qty, 10);
        assert_eq!(reason, "initial stock");
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = TenantScope::Tenant("t-a".to_string());
        let b = TenantScope::Tenant("t-b".to_string());

        // Same name in both tenants
        let pa = db.products().insert(&widget("t-a", 1), "u-1").await.unwrap();
        let pb = db.products().insert(&widget("t-b", 1), "u-2").await.unwrap();

        let listed_a = db.products().list(&a, 100).await.unwrap();
        assert_eq!(listed_a.len(), 1);
        assert_eq!(listed_a[0].id, pa.id);

        let listed_b = db.products().list(&b, 100).await.unwrap();
        assert_eq!(listed_b.len(), 1);
        assert_eq!(listed_b[0].id, pb.id);

        let err = db.products().get(&b, &pa.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));

        assert_eq!(db.products().count(&TenantScope::Global).await.unwrap(), 2);
    }
}
