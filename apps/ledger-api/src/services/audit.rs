//! # Audit Recorder
//!
//! Fire-and-forget delivery of audit events. A ledger operation records its
//! event after its own writes are committed; a failing audit write is logged
//! and never reaches the caller.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleProcessor ───┐                                                     │
//! │  InventoryLedger ─┼──► Arc<dyn AuditSink>::record(event)   (returns)   │
//! │  DrawerManager ───┘              │                                      │
//! │                                  ├── DbAuditSink     tokio::spawn      │
//! │                                  │                   └► audit_logs     │
//! │                                  └── MemoryAuditSink Vec (tests)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::warn;

use tillpoint_core::AuditEvent;
use tillpoint_db::Database;

/// Destination of audit events.
pub trait AuditSink: Send + Sync {
    /// Hands an event over. Must not block or fail the caller.
    fn record(&self, event: AuditEvent);
}

/// Writes audit events to the `audit_logs` table on a background task.
#[derive(Debug, Clone)]
pub struct DbAuditSink {
    db: Database,
}

impl DbAuditSink {
    pub fn new(db: Database) -> Self {
        DbAuditSink { db }
    }

    /// Spawns the write and returns its handle.
    pub fn spawn_record(&self, event: AuditEvent) -> JoinHandle<()> {
        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(e) = db.audit().insert(&event).await {
                warn!(
                    error = %e,
                    action = event.action.as_str(),
                    entity_id = %event.entity_id,
                    "Failed to write audit log"
                );
            }
        })
    }
}

impl AuditSink for DbAuditSink {
    fn record(&self, event: AuditEvent) {
        let _ = self.spawn_record(event);
    }
}

/// Keeps audit events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillpoint_core::AuditAction;
    use tillpoint_db::DbConfig;

    #[tokio::test]
    async fn test_db_sink_writes_in_background() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sink = DbAuditSink::new(db.clone());

        let event = AuditEvent::new("u-1", Some("t-a".into()), AuditAction::OpenDrawer, "d-1");
        sink.spawn_record(event).await.unwrap();

        let rows = db.audit().for_entity("d-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "open_drawer");
        assert_eq!(rows[0].tenant_id.as_deref(), Some("t-a"));
    }

    #[tokio::test]
    async fn test_db_sink_swallows_failures() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sink = DbAuditSink::new(db.clone());
        db.close().await;

        let event = AuditEvent::new("u-1", None, AuditAction::CreateSale, "s-1");
        // The task completes without panicking even though the pool is gone.
        sink.spawn_record(event).await.unwrap();
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEvent::new("u", None, AuditAction::OpenDrawer, "d"));
        sink.record(AuditEvent::new("u", None, AuditAction::CloseDrawer, "d"));

        let actions: Vec<_> = sink.events().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::OpenDrawer, AuditAction::CloseDrawer]);
    }
}
