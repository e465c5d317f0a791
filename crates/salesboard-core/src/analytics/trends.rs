//! Time series aggregation
//!
//! Buckets records inside a window by hour, day, ISO week or month and
//! reduces a metric per bucket. Output is sorted by bucket key.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::period::{Granularity, Period, Window};
use crate::error::CoreError;
use crate::models::{Column, Metric, Record, Table};

/// Bucket identity; ordering is chronological within one granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "granularity", content = "at", rename_all = "lowercase")]
pub enum BucketKey {
    /// Hour of day, 0-23
    Hour(u32),
    Day(NaiveDate),
    /// Monday starting the ISO week
    Week(NaiveDate),
    /// First day of the month
    Month(NaiveDate),
}

impl BucketKey {
    /// Key of the bucket containing `ts`
    pub fn for_timestamp(ts: NaiveDateTime, granularity: Granularity) -> Self {
        let date = ts.date();
        match granularity {
            Granularity::Hour => BucketKey::Hour(ts.hour()),
            Granularity::Day => BucketKey::Day(date),
            Granularity::Week => BucketKey::Week(
                date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
                    .unwrap_or(NaiveDate::MIN),
            ),
            Granularity::Month => BucketKey::Month(date.with_day(1).unwrap_or(date)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            BucketKey::Hour(h) => format!("{:02}:00", h),
            BucketKey::Day(d) | BucketKey::Week(d) => d.format("%Y-%m-%d").to_string(),
            BucketKey::Month(d) => d.format("%Y-%m").to_string(),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Reduction applied per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
}

/// One chart point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: BucketKey,
    pub label: String,
    pub value: f64,
}

/// Chart-ready series for one period
#[derive(Debug, Clone, Serialize)]
pub struct TrendSeries {
    pub period: Period,
    pub granularity: Granularity,
    pub metric: Metric,
    pub aggregation: Aggregation,
    /// Ascending by key; buckets without rows are absent
    pub points: Vec<SeriesPoint>,
}

impl TrendSeries {
    /// Empty placeholder for no data
    pub fn empty(period: Period, metric: Metric) -> Self {
        Self {
            period,
            granularity: period.granularity(),
            metric,
            aggregation: Aggregation::Sum,
            points: Vec::new(),
        }
    }

    /// Check if empty (no data in period)
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    pub fn max_value(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::max)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Running per-bucket accumulator
#[derive(Default)]
struct BucketAggregate {
    sum: f64,
    rows: usize,
}

impl BucketAggregate {
    fn reduce(&self, aggregation: Aggregation) -> f64 {
        match aggregation {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.sum / self.rows as f64,
        }
    }
}

/// Sum a metric per bucket of the window's granularity
///
/// # Errors
/// `CoreError::MissingColumns` when the table lacks `Date` or the metric.
pub fn aggregate(table: &Table, window: &Window, metric: Metric) -> Result<TrendSeries, CoreError> {
    aggregate_with(table, window, metric, Aggregation::Sum)
}

/// Like [`aggregate`] with an explicit reduction
pub fn aggregate_with(
    table: &Table,
    window: &Window,
    metric: Metric,
    aggregation: Aggregation,
) -> Result<TrendSeries, CoreError> {
    table.schema().require(&[Column::Date, metric.column()])?;

    Ok(aggregate_records(
        &window.select(table),
        window.period,
        window.granularity,
        metric,
        aggregation,
    ))
}

/// Bucket already-selected records
///
/// Rows without a date are skipped.
pub fn aggregate_records(
    records: &[&Record],
    period: Period,
    granularity: Granularity,
    metric: Metric,
    aggregation: Aggregation,
) -> TrendSeries {
    let mut buckets: BTreeMap<BucketKey, BucketAggregate> = BTreeMap::new();

    for record in records {
        let Some(ts) = record.date else {
            continue;
        };

        let agg = buckets
            .entry(BucketKey::for_timestamp(ts, granularity))
            .or_default();
        agg.sum += record.metric(metric);
        agg.rows += 1;
    }

    let points = buckets
        .into_iter()
        .map(|(key, agg)| SeriesPoint {
            key,
            label: key.label(),
            value: agg.reduce(aggregation),
        })
        .collect();

    TrendSeries {
        period,
        granularity,
        metric,
        aggregation,
        points,
    }
}

/// Metric summed per calendar day, chronological
pub fn daily_totals(records: &[&Record], metric: Metric) -> BTreeMap<NaiveDate, f64> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.date {
            *daily.entry(ts.date()).or_default() += record.metric(metric);
        }
    }
    daily
}
