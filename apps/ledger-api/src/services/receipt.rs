//! # Receipt Sequencer
//!
//! Hands out `RCP-YYYYMMDD-NNNN` numbers, one counter per tenant per UTC day.
//! Numbers are only drawn inside a sale transaction, so a rolled-back sale
//! gives its number back.

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use tillpoint_db::{DbResult, ReceiptRepository};

/// Receipt number issuer.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptSequencer;

impl ReceiptSequencer {
    /// Issues the next number for `day` on the caller's transaction.
    ///
    /// The counter upsert is a write, so calling this first makes the
    /// transaction take the write lock immediately.
    pub async fn next_in(
        conn: &mut SqliteConnection,
        tenant_id: Option<&str>,
        day: NaiveDate,
    ) -> DbResult<String> {
        ReceiptRepository::next_number_in(conn, tenant_id, day).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tillpoint_core::receipt::day_prefix;
    use tillpoint_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_numbers_are_daily_and_per_tenant() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let today = Utc::now().date_naive();
        let prefix = day_prefix(today);

        let mut tx = db.begin().await.unwrap();
        let first = ReceiptSequencer::next_in(&mut tx, Some("t-a"), today).await.unwrap();
        let second = ReceiptSequencer::next_in(&mut tx, Some("t-a"), today).await.unwrap();
        let other = ReceiptSequencer::next_in(&mut tx, Some("t-b"), today).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, format!("{prefix}-0001"));
        assert_eq!(second, format!("{prefix}-0002"));
        assert_eq!(other, format!("{prefix}-0001"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_issuance_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("ledger.db")))
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    let mut tx = db.begin().await?;
                    let number = ReceiptSequencer::next_in(&mut tx, Some("t-a"), day).await?;
                    tx.commit().await?;
                    Ok::<_, tillpoint_db::DbError>(number)
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap());
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 25);
        assert_eq!(numbers[0], "RCP-20240315-0001");
        assert_eq!(numbers[24], "RCP-20240315-0025");

        db.close().await;
    }
}
