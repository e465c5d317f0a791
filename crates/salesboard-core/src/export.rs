//! Export of chart series and dashboard reports
//!
//! CSV for series and item tables, JSON and Markdown for full reports.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analytics::{format_currency, format_thousands, ChartData, DashboardReport, ItemRank, TrendSeries};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Export a trend series to CSV
///
/// CSV columns: Bucket, Value. Rows in series order (ascending bucket).
///
/// # Errors
/// Returns error if file creation or write operations fail
pub fn export_series_to_csv(series: &TrendSeries, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Bucket,Value").context("Failed to write CSV header")?;

    for point in &series.points {
        writeln!(writer, "{},{}", csv_field(&point.label), point.value)
            .with_context(|| format!("Failed to write row for bucket {}", point.label))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Export item quantities to CSV, best sellers first
pub fn export_items_to_csv(items: &[ItemRank], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Item,Quantity").context("Failed to write CSV header")?;
    for rank in items {
        writeln!(writer, "{},{}", csv_field(&rank.item), rank.quantity)
            .with_context(|| format!("Failed to write row for item {}", rank.item))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Pretty-printed JSON of any serializable output (report, insights, series)
pub fn export_to_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;

    Ok(())
}

/// Export a dashboard report as a Markdown document
///
/// Sections: KPIs, recommendations, then one section per chart.
pub fn export_report_to_markdown(report: &DashboardReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create Markdown file: {}", path.display()))?;
    let mut w = BufWriter::new(file);

    writeln!(w, "# Sales Report ({})\n", report.period.label())?;
    if let Some(window) = &report.window {
        writeln!(
            w,
            "Window: {} to {}\n",
            window.start.format("%Y-%m-%d %H:%M"),
            window.end.format("%Y-%m-%d %H:%M")
        )?;
    }

    writeln!(w, "| Metric | Value |")?;
    writeln!(w, "|--------|-------|")?;
    writeln!(w, "| Total orders | {} |", format_thousands(report.total_orders as f64))?;
    writeln!(w, "| Total revenue | {} |", report.total_revenue_display)?;
    writeln!(w)?;

    writeln!(w, "## Recommendations\n")?;
    for line in &report.recommendations {
        writeln!(w, "- {}", line)?;
    }
    writeln!(w)?;

    for chart in [&report.trend, &report.items, &report.breakdown, &report.item_table]
        .into_iter()
        .flatten()
    {
        writeln!(w, "## {}\n", chart.title)?;
        match &chart.data {
            ChartData::Line { points } => {
                writeln!(w, "| Bucket | Value |")?;
                writeln!(w, "|--------|-------|")?;
                for p in points {
                    writeln!(w, "| {} | {} |", p.label, format_currency(p.value))?;
                }
            }
            ChartData::Bars { bars } | ChartData::Pie { slices: bars } | ChartData::Table { rows: bars } => {
                writeln!(w, "| Label | Value |")?;
                writeln!(w, "|-------|-------|")?;
                for b in bars {
                    writeln!(w, "| {} | {} |", b.label, format_thousands(b.value))?;
                }
            }
            ChartData::Weekdays { days } => {
                writeln!(w, "| Day | Average |")?;
                writeln!(w, "|-----|---------|")?;
                for d in days {
                    let value = d.value.map(format_currency).unwrap_or_else(|| "-".to_string());
                    writeln!(w, "| {} | {} |", d.day, value)?;
                }
            }
        }
        writeln!(w)?;
    }

    w.flush().context("Failed to flush Markdown writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{aggregate, resolve, AnalyticsConfig, Period};
    use crate::models::{Dimension, Metric, Record, Table};
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn table() -> Table {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Table::infer(
            (0..10)
                .map(|i| {
                    Record::new((start + Duration::days(i)).and_hms_opt(9, 0, 0))
                        .with_metric(Metric::NetSales, 100.0)
                        .with_metric(Metric::Quantity, 1.0)
                        .with_dimension(Dimension::Item, "Kopi \"Susu\"")
                })
                .collect(),
        )
    }

    #[test]
    fn test_export_series_csv() {
        let table = table();
        let resolution = resolve(&table, Period::Weekly).unwrap();
        let series = aggregate(&table, resolution.window().unwrap(), Metric::NetSales).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("series.csv");
        export_series_to_csv(&series, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "Bucket,Value");
        assert_eq!(lines[1], "\"2024-01-04\",100");
    }

    #[test]
    fn test_export_items_csv_escapes_quotes() {
        let items = vec![ItemRank {
            item: "Kopi \"Susu\"".to_string(),
            quantity: 3.0,
        }];
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/items.csv");
        export_items_to_csv(&items, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Item,Quantity\n\"Kopi \"\"Susu\"\"\",3\n");
    }

    #[test]
    fn test_export_report_json_and_markdown() {
        let report = DashboardReport::compute(&table(), Period::Weekly, &AnalyticsConfig::default());
        let temp_dir = TempDir::new().unwrap();

        let json_path = temp_dir.path().join("report.json");
        export_to_json(&report, &json_path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["total_orders"], 7);

        let md_path = temp_dir.path().join("report.md");
        export_report_to_markdown(&report, &md_path).unwrap();
        let md = std::fs::read_to_string(&md_path).unwrap();
        assert!(md.starts_with("# Sales Report (Weekly)"));
        assert!(md.contains("## Weekly Sales Trend"));
        assert!(md.contains("## Avg Sales by Day (Weekly)"));
        assert!(md.contains("| Total revenue | 700 |"));
    }
}
