//! Insight generation
//!
//! Top-N rankings, revenue totals and the rule-based recommendation lines
//! shown next to the dashboard charts. Each insight is independent: a
//! missing column drops that insight and nothing else.

use serde::Serialize;
use std::fmt;

use super::anomalies::detect_anomalies;
use super::forecasting::{forecast_revenue, ForecastData, ForecastMethod};
use super::patterns::group_by;
use super::trends::daily_totals;
use super::AnalyticsConfig;
use crate::error::CoreError;
use crate::models::{Column, Dimension, Metric, Record, Schema, Table};

/// Amount above which values are shown as rupiah
const CURRENCY_DISPLAY_THRESHOLD: f64 = 1_000_000.0;

/// Item with its summed quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRank {
    pub item: String,
    pub quantity: f64,
}

impl fmt::Display for ItemRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} sold)", self.item, format_thousands(self.quantity))
    }
}

/// Named insight results, each optional
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_item: Option<ItemRank>,
    /// Days with unusual revenue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastData>,
}

impl Insights {
    pub fn is_empty(&self) -> bool {
        self.total_revenue.is_none()
            && self.top_item.is_none()
            && self.anomalies.is_none()
            && self.forecast.is_none()
    }
}

/// Quantity sold per item, highest first
///
/// Ties keep the order in which items first appear.
///
/// # Errors
/// `CoreError::MissingColumns` without `Item` and `Quantity`.
pub fn item_quantities(schema: &Schema, records: &[&Record]) -> Result<Vec<ItemRank>, CoreError> {
    schema.require(&[Column::Item, Column::Quantity])?;

    let mut ranks: Vec<ItemRank> = group_by(records, Dimension::Item, Some(Metric::Quantity))
        .into_iter()
        .map(|g| ItemRank {
            item: g.key,
            quantity: g.sum,
        })
        .collect();

    // sort_by is stable
    ranks.sort_by(|a, b| {
        b.quantity
            .partial_cmp(&a.quantity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranks)
}

/// The `n` best-selling items
pub fn top_items(schema: &Schema, records: &[&Record], n: usize) -> Result<Vec<ItemRank>, CoreError> {
    let mut ranks = item_quantities(schema, records)?;
    ranks.truncate(n);
    Ok(ranks)
}

/// Sum of a revenue metric over the records
pub fn total_revenue(schema: &Schema, records: &[&Record], metric: Metric) -> Result<f64, CoreError> {
    schema.require(&[metric.column()])?;
    Ok(records.iter().map(|r| r.metric(metric)).sum())
}

/// Metric used for the revenue KPI: `Net sales`, else `Price`
pub fn revenue_metric(schema: &Schema) -> Option<Metric> {
    [Metric::NetSales, Metric::Price]
        .into_iter()
        .find(|m| schema.has(m.column()))
}

/// Compute every insight the schema allows over a set of records
pub fn summarize(schema: &Schema, records: &[&Record], config: &AnalyticsConfig) -> Insights {
    let mut insights = Insights {
        total_revenue: total_revenue(schema, records, Metric::NetSales).ok(),
        top_item: top_items(schema, records, 1)
            .ok()
            .and_then(|ranks| ranks.into_iter().next()),
        ..Insights::default()
    };

    if schema.has_all(&[Column::Date, Column::NetSales]) {
        let daily = daily_totals(records, Metric::NetSales);
        if !daily.is_empty() {
            insights.anomalies = Some(detect_anomalies(&daily, config).len());
        }
        insights.forecast = Some(forecast_revenue(&daily, config));
    }

    insights
}

/// Insights over the whole table
pub fn generate_summary(table: &Table, config: &AnalyticsConfig) -> Insights {
    let records: Vec<&Record> = table.records().iter().collect();
    summarize(table.schema(), &records, config)
}

/// Recommendation lines for the dashboard panel
///
/// Only a fitted (linear) forecast produces a forecast line.
pub fn recommendations(insights: &Insights) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(top) = &insights.top_item {
        lines.push(format!("Top Performer: {}.", top));
    }

    if let Some(count) = insights.anomalies.filter(|&n| n > 0) {
        lines.push(format!(
            "Alert: Detected {} days with unusual sales volume.",
            count
        ));
    }

    if let Some(forecast) = &insights.forecast {
        if let (ForecastMethod::Linear, Some(trend)) = (forecast.method, forecast.trend) {
            lines.push(format!(
                "Forecast: Sales are trending {}. Projected approx. {} next {} days.",
                trend.as_str(),
                format_currency(forecast.predicted_total),
                forecast.horizon_days
            ));
        }
    }

    if lines.is_empty() {
        lines.push("Insufficient data for advanced AI insights.".to_string());
    }

    lines
}

/// `1234567.8` -> `1,234,568`
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Always prefixed: `Rp 1,234,568`
pub fn format_rupiah(value: f64) -> String {
    format!("Rp {}", format_thousands(value))
}

/// KPI formatting: rupiah prefix only for amounts above one million
pub fn format_currency(value: f64) -> String {
    if value > CURRENCY_DISPLAY_THRESHOLD {
        format_rupiah(value)
    } else {
        format_thousands(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::forecasting::TrendDirection;

    fn sold(item: &str, qty: f64) -> Record {
        Record::new(None)
            .with_dimension(Dimension::Item, item)
            .with_metric(Metric::Quantity, qty)
    }

    #[test]
    fn test_item_quantities_stable_ties() {
        let records = [sold("A", 4.0), sold("B", 10.0), sold("A", 6.0), sold("C", 1.0)];
        let refs: Vec<&Record> = records.iter().collect();
        let table = Table::infer(records.to_vec());
        let ranks = item_quantities(table.schema(), &refs).unwrap();

        let names: Vec<&str> = ranks.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(ranks[0].quantity, 10.0);
    }

    #[test]
    fn test_top_items_truncates() {
        let records = [sold("A", 1.0), sold("B", 2.0), sold("C", 3.0), sold("D", 4.0)];
        let refs: Vec<&Record> = records.iter().collect();
        let schema = Schema::from_columns([Column::Item, Column::Quantity]);

        let top = top_items(&schema, &refs, 3).unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].item, "D");
        assert_eq!(top[2].item, "B");
    }

    #[test]
    fn test_top_items_missing_column() {
        let schema = Schema::from_columns([Column::Quantity]);
        assert!(matches!(
            top_items(&schema, &[], 3),
            Err(CoreError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_revenue_metric_fallback() {
        assert_eq!(
            revenue_metric(&Schema::from_columns([Column::Price, Column::NetSales])),
            Some(Metric::NetSales)
        );
        assert_eq!(
            revenue_metric(&Schema::from_columns([Column::Price])),
            Some(Metric::Price)
        );
        assert_eq!(revenue_metric(&Schema::new()), None);
    }

    #[test]
    fn test_summary_omits_missing_insights() {
        let table = Table::infer(vec![sold("Tea", 2.0)]);
        let insights = generate_summary(&table, &AnalyticsConfig::default());

        assert!(insights.total_revenue.is_none());
        assert!(insights.anomalies.is_none());
        assert!(insights.forecast.is_none());
        assert_eq!(insights.top_item.as_ref().map(|t| t.item.as_str()), Some("Tea"));

        let json = serde_json::to_value(&insights).unwrap();
        assert!(json.get("total_revenue").is_none());
        assert!(json.get("top_item").is_some());
    }

    #[test]
    fn test_recommendations() {
        let insights = Insights {
            top_item: Some(ItemRank {
                item: "Latte".to_string(),
                quantity: 42.0,
            }),
            anomalies: Some(2),
            forecast: Some(ForecastData {
                predicted_total: 2_500_000.0,
                trend: Some(TrendDirection::Upward),
                slope: Some(10.0),
                confidence: 0.9,
                method: ForecastMethod::Linear,
                days_observed: 10,
                horizon_days: 30,
                unavailable_reason: None,
            }),
            ..Insights::default()
        };

        assert_eq!(
            recommendations(&insights),
            vec![
                "Top Performer: Latte (42 sold).".to_string(),
                "Alert: Detected 2 days with unusual sales volume.".to_string(),
                "Forecast: Sales are trending upward. Projected approx. Rp 2,500,000 next 30 days."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_recommendations_fallback() {
        let insights = Insights {
            anomalies: Some(0),
            ..Insights::default()
        };
        assert_eq!(
            recommendations(&insights),
            vec!["Insufficient data for advanced AI insights.".to_string()]
        );
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1234567.8), "1,234,568");
        assert_eq!(format_thousands(-1500.0), "-1,500");
        assert_eq!(format_rupiah(700.0), "Rp 700");
        assert_eq!(format_currency(999_999.0), "999,999");
        assert_eq!(format_currency(1_000_001.0), "Rp 1,000,001");
    }
}
