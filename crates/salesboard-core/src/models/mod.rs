//! Data models for salesboard

pub mod record;
pub mod table;

pub use record::{Column, Dimension, Metric, Record, Schema};
pub use table::{SnapshotSummary, Table};
