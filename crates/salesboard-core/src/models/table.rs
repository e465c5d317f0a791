//! In-memory table built from one upload
//!
//! A table is never patched: each upload produces a new `Table` that
//! supersedes the previous one.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Column, Record, Schema};

/// Upload summary carried alongside the rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default)]
    pub train_rows: Option<u64>,
    #[serde(default)]
    pub test_rows: Option<u64>,
}

/// Immutable table of typed records plus its declared schema
#[derive(Debug, Clone)]
pub struct Table {
    records: Vec<Record>,
    schema: Schema,
    industry: Option<String>,
    summary: Option<SnapshotSummary>,
    loaded_at: DateTime<Utc>,
}

impl Table {
    /// Build a table with an explicit schema (the upload's header set)
    pub fn new(records: Vec<Record>, schema: Schema) -> Self {
        Self {
            records,
            schema,
            industry: None,
            summary: None,
            loaded_at: Utc::now(),
        }
    }

    /// Build a table whose schema is every column populated by at least one row
    pub fn infer(records: Vec<Record>) -> Self {
        let mut schema = Schema::new();
        for record in &records {
            for column in record.populated_columns() {
                schema.insert(column);
            }
        }
        Self::new(records, schema)
    }

    /// Empty placeholder served before the first upload
    pub fn empty() -> Self {
        Self::new(Vec::new(), Schema::new())
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_summary(mut self, summary: SnapshotSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    pub fn summary(&self) -> Option<&SnapshotSummary> {
        self.summary.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has(&self, column: Column) -> bool {
        self.schema.has(column)
    }

    /// Earliest and latest valid dates, `None` when no row has a date
    pub fn date_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut dates = self.records.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d))))
    }

    /// Whole days between the earliest and latest date
    pub fn history_days(&self) -> Option<i64> {
        self.date_span()
            .map(|(earliest, latest)| (latest - earliest).num_days())
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{Dimension, Metric};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_date_span_skips_missing_dates() {
        let table = Table::infer(vec![
            Record::new(Some(at(5, 10))),
            Record::new(None),
            Record::new(Some(at(2, 8))),
            Record::new(Some(at(9, 23))),
        ]);

        assert_eq!(table.date_span(), Some((at(2, 8), at(9, 23))));
        assert_eq!(table.history_days(), Some(7));
    }

    #[test]
    fn test_history_days_floors_partial_days() {
        let table = Table::infer(vec![
            Record::new(Some(at(1, 12))),
            Record::new(Some(at(3, 11))),
        ]);
        assert_eq!(table.history_days(), Some(1));
    }

    #[test]
    fn test_empty_table_has_no_span() {
        let table = Table::empty();
        assert!(table.is_empty());
        assert_eq!(table.date_span(), None);
        assert_eq!(table.history_days(), None);
    }

    #[test]
    fn test_infer_schema_from_rows() {
        let table = Table::infer(vec![
            Record::new(Some(at(1, 0))).with_metric(Metric::NetSales, 10.0),
            Record::new(None).with_dimension(Dimension::Item, "Tea"),
        ]);

        assert!(table.has(Column::Date));
        assert!(table.has(Column::NetSales));
        assert!(table.has(Column::Item));
        assert!(!table.has(Column::Quantity));
    }
}
