//! Parsers for uploaded tables

pub mod coerce;
pub mod snapshot;

pub use coerce::{coerce_number, parse_datetime, parse_number};
pub use snapshot::{parse_snapshot_str, SnapshotParser};
