//! Dashboard report for one period
//!
//! Picks which charts can be drawn from the table's schema, fills them from
//! the records in scope, and attaches KPIs, insights and recommendations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::insights::{
    format_currency, item_quantities, recommendations, revenue_metric, summarize, top_items,
    Insights,
};
use super::patterns::{mean_by, value_counts, weekday_averages, WeekdayAverage};
use super::period::{select, Period, Scope, Window};
use super::trends::{aggregate_records, Aggregation, SeriesPoint};
use super::AnalyticsConfig;
use crate::error::CoreError;
use crate::models::{Column, Dimension, Metric, Record, Schema, Table};

const NO_DATA_TITLE: &str = "NO DATA AVAILABLE";
const NO_DATA_MESSAGE: &str = "Insufficient data to generate analysis for this period.";

/// Trend values above this switch the title to rupiah
const RUPIAH_TITLE_THRESHOLD: f64 = 1_000_000.0;

/// Towns listed in the listings chart
const TOP_TOWNS: usize = 10;

/// Label/value pair for bar and pie charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

impl Bar {
    fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartData {
    /// Time series
    Line { points: Vec<SeriesPoint> },
    Bars { bars: Vec<Bar> },
    /// Share of rows per category
    Pie { slices: Vec<Bar> },
    /// Monday..Sunday averages
    Weekdays { days: Vec<WeekdayAverage> },
    /// Full item/quantity listing
    Table { rows: Vec<Bar> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    #[serde(flatten)]
    pub data: ChartData,
}

impl Chart {
    fn new(title: impl Into<String>, data: ChartData) -> Self {
        Self {
            title: title.into(),
            data,
        }
    }
}

/// Whether the period had anything to report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Ready,
    NoData { reason: String },
}

/// Complete dashboard data for a period
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub period: Period,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
    pub total_orders: usize,
    pub total_revenue: f64,
    /// `total_revenue` as shown on the KPI card
    pub total_revenue_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Chart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Chart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Chart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_table: Option<Chart>,
    pub insights: Insights,
    pub recommendations: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl DashboardReport {
    /// Build the dashboard for a period
    ///
    /// Never fails: missing dates, short history and empty windows all give
    /// a `NoData` report; missing columns drop the affected chart.
    pub fn compute(table: &Table, period: Period, config: &AnalyticsConfig) -> Self {
        let scope = match select(table, period) {
            Ok(scope) => scope,
            Err(CoreError::NoData) => {
                return Self::no_data(period, None, "No valid dates in the uploaded table");
            }
            Err(e) => return Self::no_data(period, None, &e.to_string()),
        };

        match &scope {
            Scope::Insufficient {
                history_days,
                required_days,
            } => {
                return Self::no_data(
                    period,
                    None,
                    &format!(
                        "{} needs {} days of history, table spans {}",
                        period.label(),
                        required_days,
                        history_days
                    ),
                );
            }
            Scope::Records { window, records } if records.is_empty() => {
                return Self::no_data(period, *window, "No rows in the selected window");
            }
            Scope::Records { .. } => {}
        }

        let schema = table.schema();
        let records = scope.records();
        let label = period.label();

        let total_revenue = revenue_metric(schema)
            .map(|m| records.iter().map(|r| r.metric(m)).sum())
            .unwrap_or(0.0);

        let insights = summarize(schema, records, config);
        let recommendations = recommendations(&insights);

        tracing::debug!(
            %period,
            rows = records.len(),
            total_revenue,
            "Dashboard report computed"
        );

        Self {
            period,
            status: ReportStatus::Ready,
            window: scope.window().copied(),
            total_orders: records.len(),
            total_revenue,
            total_revenue_display: format_currency(total_revenue),
            trend: trend_chart(schema, records, &scope, period),
            items: items_chart(schema, records, label, config),
            breakdown: breakdown_chart(schema, records, label),
            item_table: item_table(schema, records, label),
            insights,
            recommendations,
            computed_at: Utc::now(),
        }
    }

    fn no_data(period: Period, window: Option<Window>, reason: &str) -> Self {
        tracing::debug!(%period, reason, "Dashboard has no data");

        let placeholder = |data| Some(Chart::new(NO_DATA_TITLE, data));
        Self {
            period,
            status: ReportStatus::NoData {
                reason: reason.to_string(),
            },
            window,
            total_orders: 0,
            total_revenue: 0.0,
            total_revenue_display: format_currency(0.0),
            trend: placeholder(ChartData::Line { points: Vec::new() }),
            items: placeholder(ChartData::Bars { bars: Vec::new() }),
            breakdown: placeholder(ChartData::Pie { slices: Vec::new() }),
            item_table: None,
            insights: Insights::default(),
            recommendations: vec![NO_DATA_MESSAGE.to_string()],
            computed_at: Utc::now(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.status == ReportStatus::Ready
    }
}

fn trend_title(period: Period) -> String {
    match period {
        Period::AllTime => "Sales Trend".to_string(),
        other => format!("{} Sales Trend", other.label()),
    }
}

/// Revenue over time, or average price per district for listings
fn trend_chart(schema: &Schema, records: &[&Record], scope: &Scope<'_>, period: Period) -> Option<Chart> {
    if schema.has_all(&[Column::Date, Column::NetSales]) {
        let granularity = scope
            .window()
            .map(|w| w.granularity)
            .unwrap_or_else(|| period.granularity());
        let series = aggregate_records(records, period, granularity, Metric::NetSales, Aggregation::Sum);

        let mut title = trend_title(period);
        if series.max_value().is_some_and(|max| max > RUPIAH_TITLE_THRESHOLD) {
            title.push_str(" (Rp)");
        }
        return Some(Chart::new(title, ChartData::Line { points: series.points }));
    }

    if schema.has_all(&[Column::District, Column::Price]) {
        let bars = mean_by(records, Dimension::District, Metric::Price)
            .into_iter()
            .map(|(district, avg)| Bar::new(district, avg))
            .collect();
        return Some(Chart::new(
            "Average Property Price by District",
            ChartData::Bars { bars },
        ));
    }

    None
}

/// Best sellers, or listing types for property data
fn items_chart(schema: &Schema, records: &[&Record], label: &str, config: &AnalyticsConfig) -> Option<Chart> {
    if let Ok(top) = top_items(schema, records, config.top_items_dashboard) {
        let bars = top.into_iter().map(|r| Bar::new(r.item, r.quantity)).collect();
        return Some(Chart::new(
            format!("Top {} Items ({})", config.top_items_dashboard, label),
            ChartData::Bars { bars },
        ));
    }

    if schema.has(Column::Type) {
        return Some(Chart::new(
            "Property Type Distribution",
            ChartData::Pie {
                slices: counts_as_bars(value_counts(records, Dimension::Type)),
            },
        ));
    }

    None
}

/// Third chart: the first of dining split, weekday averages, property
/// condition and top towns that the schema supports
fn breakdown_chart(schema: &Schema, records: &[&Record], label: &str) -> Option<Chart> {
    if schema.has(Column::DiningOption) {
        return Some(Chart::new(
            format!("Dine In vs Take Away ({})", label),
            ChartData::Pie {
                slices: counts_as_bars(value_counts(records, Dimension::DiningOption)),
            },
        ));
    }

    if schema.has_all(&[Column::NetSales, Column::Date]) {
        return Some(Chart::new(
            format!("Avg Sales by Day ({})", label),
            ChartData::Weekdays {
                days: weekday_averages(records, Metric::NetSales),
            },
        ));
    }

    if schema.has(Column::Condition) {
        return Some(Chart::new(
            "Property Condition",
            ChartData::Pie {
                slices: counts_as_bars(value_counts(records, Dimension::Condition)),
            },
        ));
    }

    if schema.has(Column::Town) {
        let mut towns = value_counts(records, Dimension::Town);
        towns.truncate(TOP_TOWNS);
        return Some(Chart::new(
            "Top 10 Towns by Listings",
            ChartData::Bars {
                bars: counts_as_bars(towns),
            },
        ));
    }

    None
}

fn item_table(schema: &Schema, records: &[&Record], label: &str) -> Option<Chart> {
    let ranks = item_quantities(schema, records).ok()?;
    Some(Chart::new(
        format!("Top Items Sold ({})", label),
        ChartData::Table {
            rows: ranks.into_iter().map(|r| Bar::new(r.item, r.quantity)).collect(),
        },
    ))
}

fn counts_as_bars(counts: Vec<(String, usize)>) -> Vec<Bar> {
    counts
        .into_iter()
        .map(|(label, count)| Bar::new(label, count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn fnb_table(days: i64) -> Table {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut records = Vec::new();
        for i in 0..days {
            let ts = (start + Duration::days(i)).and_hms_opt(10, 0, 0);
            records.push(
                Record::new(ts)
                    .with_metric(Metric::NetSales, 50_000.0)
                    .with_metric(Metric::Quantity, 2.0)
                    .with_dimension(Dimension::Item, if i % 2 == 0 { "Latte" } else { "Tea" })
                    .with_dimension(Dimension::DiningOption, "Dine In"),
            );
        }
        Table::infer(records)
    }

    #[test]
    fn test_fnb_weekly_report() {
        let report = DashboardReport::compute(&fnb_table(30), Period::Weekly, &AnalyticsConfig::default());

        assert!(report.has_data());
        assert_eq!(report.total_orders, 7);
        assert_eq!(report.total_revenue, 350_000.0);
        assert_eq!(report.total_revenue_display, "350,000");

        let trend = report.trend.unwrap();
        assert_eq!(trend.title, "Weekly Sales Trend");
        assert!(matches!(trend.data, ChartData::Line { ref points } if points.len() == 7));

        assert_eq!(report.items.unwrap().title, "Top 5 Items (Weekly)");
        assert_eq!(report.breakdown.unwrap().title, "Dine In vs Take Away (Weekly)");
        assert_eq!(report.item_table.unwrap().title, "Top Items Sold (Weekly)");
        assert_eq!(report.insights.anomalies, Some(0));
    }

    #[test]
    fn test_rupiah_suffix_on_large_trend() {
        let table = Table::infer(vec![Record::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(9, 0, 0)),
        )
        .with_metric(Metric::NetSales, 2_000_000.0)]);
        let report = DashboardReport::compute(&table, Period::Daily, &AnalyticsConfig::default());

        assert_eq!(report.trend.unwrap().title, "Daily Sales Trend (Rp)");
        assert_eq!(report.total_revenue_display, "Rp 2,000,000");
    }

    #[test]
    fn test_short_history_is_no_data() {
        let report = DashboardReport::compute(&fnb_table(10), Period::Monthly, &AnalyticsConfig::default());

        assert!(!report.has_data());
        assert_eq!(report.total_orders, 0);
        assert_eq!(report.trend.unwrap().title, NO_DATA_TITLE);
        assert_eq!(report.recommendations, vec![NO_DATA_MESSAGE.to_string()]);
    }

    #[test]
    fn test_property_listing_charts() {
        let table = Table::infer(vec![
            Record::new(None)
                .with_metric(Metric::Price, 100.0)
                .with_dimension(Dimension::District, "North")
                .with_dimension(Dimension::Type, "House")
                .with_dimension(Dimension::Condition, "New"),
            Record::new(None)
                .with_metric(Metric::Price, 300.0)
                .with_dimension(Dimension::District, "North")
                .with_dimension(Dimension::Type, "Flat")
                .with_dimension(Dimension::Condition, "Used"),
        ]);
        let report = DashboardReport::compute(&table, Period::AllTime, &AnalyticsConfig::default());

        assert!(report.has_data());
        assert_eq!(report.total_revenue, 400.0);
        let trend = report.trend.unwrap();
        assert_eq!(trend.title, "Average Property Price by District");
        assert_eq!(
            trend.data,
            ChartData::Bars {
                bars: vec![Bar::new("North", 200.0)]
            }
        );
        assert_eq!(report.items.unwrap().title, "Property Type Distribution");
        assert_eq!(report.breakdown.unwrap().title, "Property Condition");
        assert!(report.item_table.is_none());
    }

    #[test]
    fn test_undated_table_for_windowed_period() {
        let table = Table::infer(vec![Record::new(None).with_metric(Metric::NetSales, 1.0)]);
        let report = DashboardReport::compute(&table, Period::Weekly, &AnalyticsConfig::default());
        assert!(matches!(report.status, ReportStatus::NoData { .. }));
    }

    #[test]
    fn test_report_serializes_chart_kind() {
        let report = DashboardReport::compute(&fnb_table(8), Period::Weekly, &AnalyticsConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"]["status"], "ready");
        assert_eq!(json["trend"]["kind"], "line");
        assert_eq!(json["period"], "weekly");
    }
}
