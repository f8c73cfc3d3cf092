//! # Receipt Sequence Repository
//!
//! One atomic counter per tenant per UTC day.
//!
//! ```text
//! receipt_sequences
//! ┌────────────┬──────────┬────────────┐
//! │ tenant_key │ day      │ last_value │
//! ├────────────┼──────────┼────────────┤
//! │ t-a        │ 20240315 │ 42         │ ◄── INSERT ... ON CONFLICT DO UPDATE
//! │ t-b        │ 20240315 │ 7          │     SET last_value = last_value + 1
//! │ ''         │ 20240315 │ 1          │     RETURNING last_value
//! └────────────┴──────────┴────────────┘
//! ```
//!
//! The increment runs inside the sale's transaction, so a rolled-back sale
//! gives its number back.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillpoint_core::receipt;

/// Receipt counters. Only reachable through a caller's transaction.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptRepository;

impl ReceiptRepository {
    /// Issues the next receipt number on a caller-provided transaction.
    pub async fn next_number_in(
        conn: &mut SqliteConnection,
        tenant_id: Option<&str>,
        day: NaiveDate,
    ) -> DbResult<String> {
        let value = Self::increment_in(conn, tenant_id, day).await?;
        let number = receipt::format_receipt_number(day, value);

        debug!(tenant_id = ?tenant_id, receipt_number = %number, "Issued receipt number");
        Ok(number)
    }

    async fn increment_in(
        conn: &mut SqliteConnection,
        tenant_id: Option<&str>,
        day: NaiveDate,
    ) -> DbResult<u32> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO receipt_sequences (tenant_key, day, last_value)
            VALUES (?1, ?2, 1)
            ON CONFLICT (tenant_key, day) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id.unwrap_or(""))
        .bind(receipt::day_key(day))
        .fetch_one(&mut *conn)
        .await?;

        u32::try_from(value)
            .map_err(|_| DbError::Internal(format!("receipt sequence out of range: {value}")))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
