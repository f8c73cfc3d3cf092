//! # Audit Log Repository
//!
//! Append-only storage for audit events. Querying audit history is outside
//! the ledger; the read here exists for diagnostics and tests.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tillpoint_core::AuditEvent;

/// A stored audit row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Repository for audit logs.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an audit event.
    pub async fn insert(&self, event: &AuditEvent) -> DbResult<()> {
        debug!(
            action = event.action.as_str(),
            entity_id = %event.entity_id,
            "Writing audit log"
        );

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, user_id, tenant_id, action, entity_type, entity_id, details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&event.user_id)
        .bind(&event.tenant_id)
        .bind(event.action.as_str())
        .bind(event.action.entity_type())
        .bind(&event.entity_id)
        .bind(event.details.as_ref().map(|d| d.to_string()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Audit rows of one entity, oldest first.
    pub async fn for_entity(&self, entity_id: &str) -> DbResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, user_id, tenant_id, action, entity_type, entity_id, details, created_at
              FROM audit_logs
             WHERE entity_id = ?1
             ORDER BY created_at, rowid
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
