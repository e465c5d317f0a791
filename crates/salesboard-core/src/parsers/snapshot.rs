//! Snapshot parser for the dashboard hand-off file (`data.json`)
//!
//! The cleaning step writes `{ "industry", "summary", "sample_data": [...] }`
//! where every row maps a column header to a stringified cell. Parsing retries
//! because the file may be mid-write when a reload is triggered.

use crate::error::{CoreError, ErrorSeverity, LoadError, LoadReport};
use crate::models::{Column, Dimension, Metric, Record, Schema, SnapshotSummary, Table};
use crate::parsers::coerce;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Raw file layout before coercion
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    summary: Option<SnapshotSummary>,
    #[serde(default)]
    sample_data: Vec<Map<String, Value>>,
}

/// Parser for snapshot files
pub struct SnapshotParser {
    /// Maximum retry attempts
    max_retries: u32,
    /// Delay between retries
    retry_delay: Duration,
}

impl Default for SnapshotParser {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl SnapshotParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Parse a snapshot file with retry logic
    ///
    /// A missing file is not retried.
    pub async fn parse(&self, path: &Path, report: &mut LoadReport) -> Result<Table, CoreError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt, "Retrying snapshot parse after delay");
                sleep(self.retry_delay).await;
            }

            match self.try_parse(path, report).await {
                Ok(table) => return Ok(table),
                Err(e @ CoreError::SnapshotNotFound { .. }) => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "Snapshot parse attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::SnapshotNotFound {
            path: path.to_path_buf(),
        }))
    }

    /// Single parse attempt
    async fn try_parse(&self, path: &Path, report: &mut LoadReport) -> Result<Table, CoreError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::SnapshotNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CoreError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let raw: RawSnapshot = serde_json::from_str(&content).map_err(|e| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })?;

        Ok(build_table(raw, report))
    }

    /// Parse with graceful degradation, recording errors in LoadReport
    pub async fn parse_graceful(&self, path: &Path, report: &mut LoadReport) -> Option<Table> {
        match self.parse(path, report).await {
            Ok(table) => Some(table),
            Err(e @ CoreError::SnapshotNotFound { .. }) => {
                // Not yet written is expected before the first upload
                report.add_error(LoadError {
                    severity: ErrorSeverity::Warning,
                    ..LoadError::from_core_error("snapshot", &e)
                });
                None
            }
            Err(e) => {
                report.add_error(LoadError::from_core_error("snapshot", &e));
                None
            }
        }
    }
}

/// Parse snapshot JSON already held in memory
pub fn parse_snapshot_str(content: &str, report: &mut LoadReport) -> Result<Table, serde_json::Error> {
    let raw: RawSnapshot = serde_json::from_str(content)?;
    Ok(build_table(raw, report))
}

fn build_table(raw: RawSnapshot, report: &mut LoadReport) -> Table {
    let mut schema = Schema::new();
    let mut records = Vec::with_capacity(raw.sample_data.len());

    for row in &raw.sample_data {
        records.push(ingest_row(row, &mut schema, report));
    }

    report.snapshot_loaded = true;
    report.rows_loaded += records.len();

    if report.invalid_dates > 0 {
        report.add_warning(
            "snapshot",
            format!("{} rows with missing or invalid dates", report.invalid_dates),
        );
    }
    if report.coerced_numbers > 0 {
        report.add_warning(
            "snapshot",
            format!("{} numeric cells coerced to zero", report.coerced_numbers),
        );
    }

    info!(
        rows = records.len(),
        columns = schema.len(),
        industry = raw.industry.as_deref().unwrap_or("unknown"),
        "Snapshot ingested"
    );

    let mut table = Table::new(records, schema);
    if let Some(industry) = raw.industry {
        table = table.with_industry(industry);
    }
    if let Some(summary) = raw.summary {
        table = table.with_summary(summary);
    }
    table
}

fn ingest_row(row: &Map<String, Value>, schema: &mut Schema, report: &mut LoadReport) -> Record {
    let mut record = Record::default();
    let mut saw_date_column = false;

    for (header, value) in row {
        let Some(column) = Column::from_name(header) else {
            continue;
        };
        schema.insert(column);

        match column {
            Column::Date => {
                saw_date_column = true;
                record.date = match value {
                    Value::Number(n) => n.as_i64().and_then(coerce::datetime_from_epoch_millis),
                    other => cell_text(other).as_deref().and_then(coerce::parse_datetime),
                };
            }
            Column::NetSales => ingest_metric(&mut record, Metric::NetSales, value, report),
            Column::GrossSales => ingest_metric(&mut record, Metric::GrossSales, value, report),
            Column::Price => ingest_metric(&mut record, Metric::Price, value, report),
            Column::Quantity => ingest_metric(&mut record, Metric::Quantity, value, report),
            Column::Item => ingest_dimension(&mut record, Dimension::Item, value),
            Column::District => ingest_dimension(&mut record, Dimension::District, value),
            Column::Type => ingest_dimension(&mut record, Dimension::Type, value),
            Column::Condition => ingest_dimension(&mut record, Dimension::Condition, value),
            Column::DiningOption => ingest_dimension(&mut record, Dimension::DiningOption, value),
            Column::Status => ingest_dimension(&mut record, Dimension::Status, value),
            Column::Town => ingest_dimension(&mut record, Dimension::Town, value),
        }
    }

    if saw_date_column && record.date.is_none() {
        report.invalid_dates += 1;
    }

    record
}

fn ingest_metric(record: &mut Record, metric: Metric, value: &Value, report: &mut LoadReport) {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        other => cell_text(other).as_deref().and_then(coerce::parse_number),
    };

    if parsed.is_none() {
        report.coerced_numbers += 1;
    }
    *record.metric_slot(metric) = Some(parsed.unwrap_or(0.0));
}

fn ingest_dimension(record: &mut Record, dimension: Dimension, value: &Value) {
    *record.dimension_slot(dimension) = cell_text(value).as_deref().and_then(coerce::coerce_text);
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
