//! salesboard-core - Core library for salesboard
//!
//! Snapshot ingestion, period resolution, aggregation, insights, the chat
//! responder, and a live table store with file watching.

pub mod analytics;
pub mod chat;
pub mod error;
pub mod event;
pub mod export;
pub mod models;
pub mod parsers;
pub mod store;
pub mod watcher;

pub use analytics::{AnalyticsConfig, DashboardReport, Period};
pub use chat::{ChatAnswer, Intent, QueryResponder};
pub use error::{CoreError, DegradedState, LoadReport};
pub use event::{DataEvent, EventBus};
pub use export::{export_items_to_csv, export_report_to_markdown, export_series_to_csv, export_to_json};
pub use models::{Column, Metric, Record, Schema, Table};
pub use store::{TableStore, TableStoreConfig};
pub use watcher::{FileWatcher, WatcherConfig};
