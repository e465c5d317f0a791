//! Table store with parking_lot::RwLock
//!
//! Holds the current snapshot as an `Arc<Table>`. Readers clone the `Arc`
//! and keep a consistent table for the whole request; a reload builds the
//! new table first and swaps the pointer under a short write lock.

use crate::analytics::{AnalyticsConfig, DashboardReport, Period};
use crate::chat::{ChatAnswer, QueryResponder};
use crate::error::{DegradedState, LoadReport};
use crate::event::{DataEvent, EventBus};
use crate::models::Table;
use crate::parsers::SnapshotParser;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the table store
#[derive(Debug, Clone)]
pub struct TableStoreConfig {
    /// Snapshot file written by the cleaning step
    pub snapshot_path: PathBuf,

    /// Snapshot parser retry count
    pub retry_count: u32,

    /// Snapshot parser retry delay
    pub retry_delay: Duration,
}

impl Default for TableStoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("static/data.json"),
            retry_count: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Owner of the current table snapshot
#[derive(Debug)]
pub struct TableStore {
    config: TableStoreConfig,

    /// Current table; replaced wholesale, never mutated
    table: RwLock<Arc<Table>>,

    /// Event bus for notifying subscribers
    event_bus: EventBus,

    /// Current degraded state
    degraded_state: RwLock<DegradedState>,
}

impl TableStore {
    pub fn new(config: TableStoreConfig) -> Self {
        Self {
            config,
            table: RwLock::new(Arc::new(Table::empty())),
            event_bus: EventBus::default_capacity(),
            degraded_state: RwLock::new(DegradedState::Healthy),
        }
    }

    /// Create with default configuration for a snapshot path
    pub fn with_defaults(snapshot_path: PathBuf) -> Self {
        Self::new(TableStoreConfig {
            snapshot_path,
            ..TableStoreConfig::default()
        })
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.config.snapshot_path
    }

    /// Get the event bus for subscribing to updates
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn degraded_state(&self) -> DegradedState {
        self.degraded_state.read().clone()
    }

    /// Current table snapshot
    pub fn table(&self) -> Arc<Table> {
        Arc::clone(&self.table.read())
    }

    /// Swap in a new table and notify subscribers
    pub fn replace(&self, table: Table) {
        let rows = table.len();
        self.swap(table);
        self.event_bus.publish(DataEvent::TableReplaced { rows });
    }

    fn swap(&self, table: Table) {
        let next = Arc::new(table);
        *self.table.write() = next;
    }

    /// First load of the snapshot
    pub async fn initial_load(&self) -> LoadReport {
        info!(path = %self.config.snapshot_path.display(), "Loading snapshot");

        let mut report = LoadReport::new();
        if let Some(table) = self.parse(&mut report).await {
            self.swap(table);
        }

        self.update_degraded_state(&report);
        self.event_bus.publish(DataEvent::LoadCompleted);

        info!(
            snapshot_loaded = report.snapshot_loaded,
            rows = report.rows_loaded,
            errors = report.errors.len(),
            "Initial load complete"
        );

        report
    }

    /// Reload the snapshot (called by the watcher)
    ///
    /// A failed reload keeps serving the previous table.
    pub async fn reload(&self) -> LoadReport {
        let mut report = LoadReport::new();

        match self.parse(&mut report).await {
            Some(table) => {
                debug!(rows = table.len(), "Snapshot reloaded");
                self.replace(table);
            }
            None => {
                let reason = report
                    .errors
                    .last()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Snapshot reload failed".to_string());
                warn!(reason = %reason, "Reload failed, keeping previous table");
                self.event_bus.publish(DataEvent::LoadFailed(reason));
            }
        }

        self.update_degraded_state(&report);
        report
    }

    async fn parse(&self, report: &mut LoadReport) -> Option<Table> {
        SnapshotParser::new()
            .with_retries(self.config.retry_count, self.config.retry_delay)
            .parse_graceful(&self.config.snapshot_path, report)
            .await
    }

    /// Update degraded state based on load report
    fn update_degraded_state(&self, report: &LoadReport) {
        let mut state = self.degraded_state.write();

        if !report.snapshot_loaded {
            let reason = report
                .errors
                .last()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Snapshot not loaded".to_string());
            *state = DegradedState::Stale { reason };
            return;
        }

        let warnings: Vec<String> = report.warnings().map(|w| w.message.clone()).collect();
        *state = if warnings.is_empty() {
            DegradedState::Healthy
        } else {
            DegradedState::PartialData {
                reason: warnings.join("; "),
            }
        };
    }

    // ===================
    // Request helpers
    // ===================

    /// Dashboard for a period against the current snapshot
    pub fn dashboard(&self, period: Period, config: &AnalyticsConfig) -> DashboardReport {
        let table = self.table();
        DashboardReport::compute(&table, period, config)
    }

    /// Chat answer against the current snapshot
    pub fn ask(&self, question: &str, config: &AnalyticsConfig) -> ChatAnswer {
        let table = self.table();
        QueryResponder::new(&table, config).respond(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metric, Record};
    use tempfile::tempdir;

    const SNAPSHOT: &str = r#"{
        "industry": "F&B",
        "sample_data": [
            { "Date": "2024-01-01 09:00:00", "Item": "Latte", "Quantity": "2", "Net sales": "50000" },
            { "Date": "2024-01-02 10:00:00", "Item": "Tea", "Quantity": "1", "Net sales": "20000" }
        ]
    }"#;

    fn fast_config(path: PathBuf) -> TableStoreConfig {
        TableStoreConfig {
            snapshot_path: path,
            retry_count: 0,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_store_creation() {
        let dir = tempdir().unwrap();
        let store = TableStore::with_defaults(dir.path().join("data.json"));

        assert!(store.table().is_empty());
        assert!(store.degraded_state().is_healthy());
    }

    #[tokio::test]
    async fn test_initial_load_missing_file() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(fast_config(dir.path().join("data.json")));

        let report = store.initial_load().await;

        assert!(report.has_errors());
        assert!(!report.snapshot_loaded);
        assert!(store.degraded_state().is_degraded());
        assert!(store.table().is_empty());
    }

    #[tokio::test]
    async fn test_initial_load_with_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let store = TableStore::new(fast_config(path));
        let report = store.initial_load().await;

        assert!(report.snapshot_loaded);
        assert_eq!(store.table().len(), 2);
        assert_eq!(store.table().industry(), Some("F&B"));
        assert!(store.degraded_state().is_healthy());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let store = TableStore::new(fast_config(path.clone()));
        store.initial_load().await;
        let before = store.table();

        let mut rx = store.event_bus().subscribe();
        std::fs::write(&path, "{ truncated").unwrap();
        store.reload().await;

        assert!(Arc::ptr_eq(&before, &store.table()));
        assert!(matches!(
            store.degraded_state(),
            DegradedState::Stale { .. }
        ));
        assert!(matches!(rx.recv().await.unwrap(), DataEvent::LoadFailed(_)));
    }

    #[tokio::test]
    async fn test_replace_swaps_snapshot() {
        let store = TableStore::with_defaults(PathBuf::from("unused.json"));
        let held = store.table();
        let mut rx = store.event_bus().subscribe();

        store.replace(Table::infer(vec![
            Record::new(None).with_metric(Metric::NetSales, 1.0)
        ]));

        // Old readers keep their snapshot
        assert!(held.is_empty());
        assert_eq!(store.table().len(), 1);
        assert!(matches!(
            rx.recv().await.unwrap(),
            DataEvent::TableReplaced { rows: 1 }
        ));
    }

    #[tokio::test]
    async fn test_request_helpers_use_current_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let store = TableStore::new(fast_config(path));
        store.initial_load().await;
        let config = AnalyticsConfig::default();

        let answer = store.ask("total revenue", &config);
        assert_eq!(answer.text, "Total Net Sales (All Time) is: Rp 70,000");

        let report = store.dashboard(Period::AllTime, &config);
        assert_eq!(report.total_orders, 2);
    }
}
