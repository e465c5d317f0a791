//! Output formatting for CLI commands
//!
//! Every formatter returns either a human table (comfy-table) or pretty JSON.

use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use salesboard_core::analytics::{
    format_currency, format_thousands, Anomaly, AnomalySeverity, ChartData, DashboardReport,
    Insights, ReportStatus, TrendSeries,
};
use salesboard_core::{ChatAnswer, DataEvent};
use serde::Serialize;

/// Longest label printed in a table cell
const MAX_LABEL: usize = 32;

// ============================================================================
// Formatters
// ============================================================================

/// Format a dashboard report as tables (human) or JSON
pub fn format_report(report: &DashboardReport, json: bool, no_color: bool) -> String {
    if json {
        return to_json(report);
    }

    let mut out = vec![format!("Sales Report ({})", report.period.label())];

    if let ReportStatus::NoData { reason } = &report.status {
        out.push(format!("No data: {}", reason));
        out.extend(report.recommendations.iter().cloned());
        return out.join("\n");
    }

    if let Some(window) = &report.window {
        out.push(format!(
            "Window: {} to {}",
            window.start.format("%Y-%m-%d %H:%M"),
            window.end.format("%Y-%m-%d %H:%M")
        ));
    }
    out.push(String::new());

    let mut kpis = new_table(&["Metric", "Value"], no_color);
    kpis.add_row(Row::from(vec![
        "Total orders".to_string(),
        format_thousands(report.total_orders as f64),
    ]));
    kpis.add_row(Row::from(vec![
        "Total revenue".to_string(),
        report.total_revenue_display.clone(),
    ]));
    out.push(kpis.to_string());

    for chart in [&report.trend, &report.items, &report.breakdown, &report.item_table]
        .into_iter()
        .flatten()
    {
        out.push(String::new());
        out.push(chart.title.clone());
        out.push(chart_table(&chart.data, no_color).to_string());
    }

    out.push(String::new());
    out.push("Recommendations:".to_string());
    for line in &report.recommendations {
        out.push(format!("  - {}", line));
    }

    out.join("\n")
}

/// Format a trend series (human or JSON)
pub fn format_series(series: &TrendSeries, json: bool, no_color: bool) -> String {
    if json {
        return to_json(series);
    }

    if series.is_empty() {
        return "No data points.".to_string();
    }

    let mut table = new_table(&["Bucket", "Value"], no_color);
    for point in &series.points {
        table.add_row(Row::from(vec![point.label.clone(), format_currency(point.value)]));
    }

    format!("{}\n{} buckets, total {}", table, series.len(), format_currency(series.total()))
}

/// Format a chat answer
pub fn format_answer(answer: &ChatAnswer, json: bool) -> String {
    if json {
        return to_json(answer);
    }
    answer.text.clone()
}

/// Format whole-table insights with the anomaly list behind the count
pub fn format_summary(
    insights: &Insights,
    recommendations: &[String],
    anomalies: &[Anomaly],
    json: bool,
    no_color: bool,
) -> String {
    if json {
        #[derive(Serialize)]
        struct Summary<'a> {
            insights: &'a Insights,
            recommendations: &'a [String],
            anomalies: &'a [Anomaly],
        }
        return to_json(&Summary {
            insights,
            recommendations,
            anomalies,
        });
    }

    if insights.is_empty() {
        return "No insights available for this table.".to_string();
    }

    let mut lines = vec![];
    if let Some(total) = insights.total_revenue {
        lines.push(format!("Total revenue:    {}", format_currency(total)));
    }
    if let Some(top) = &insights.top_item {
        lines.push(format!("Top item:         {}", top));
    }
    if let Some(forecast) = &insights.forecast {
        match &forecast.unavailable_reason {
            Some(reason) => lines.push(format!("Forecast:         {}", reason)),
            None => lines.push(format!(
                "Forecast:         {} over next {} days ({} days observed)",
                format_currency(forecast.predicted_total),
                forecast.horizon_days,
                forecast.days_observed
            )),
        }
    }
    if let Some(count) = insights.anomalies {
        lines.push(format!("Anomalous days:   {}", count));
    }

    if !anomalies.is_empty() {
        let mut table = new_table(&["Date", "Revenue", "Deviation", "Severity"], no_color);
        for anomaly in anomalies {
            let severity = if no_color {
                Cell::new(anomaly.severity.label())
            } else {
                let color = match anomaly.severity {
                    AnomalySeverity::Critical => Color::Red,
                    AnomalySeverity::Warning => Color::Yellow,
                };
                Cell::new(anomaly.severity.label()).fg(color)
            };
            table.add_row(vec![
                Cell::new(anomaly.date.format("%Y-%m-%d")),
                Cell::new(format_currency(anomaly.value)),
                Cell::new(anomaly.format_deviation()),
                severity,
            ]);
        }
        lines.push(String::new());
        lines.push(table.to_string());
    }

    lines.push(String::new());
    lines.push("Recommendations:".to_string());
    for line in recommendations {
        lines.push(format!("  - {}", line));
    }

    lines.join("\n")
}

/// One line per store event in watch mode
pub fn format_event(event: &DataEvent) -> String {
    match event {
        DataEvent::TableReplaced { rows } => format!("Snapshot reloaded: {} rows", rows),
        DataEvent::LoadCompleted => "Snapshot loaded".to_string(),
        DataEvent::LoadFailed(reason) => format!("Reload failed, keeping previous data: {}", reason),
        DataEvent::WatcherError(message) => format!("Watcher error: {}", message),
    }
}

// ============================================================================
// Utilities
// ============================================================================

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn new_table(headers: &[&str], no_color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    // Apply colors only if enabled
    if no_color {
        table.set_header(headers.to_vec());
    } else {
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
    table
}

fn chart_table(data: &ChartData, no_color: bool) -> Table {
    match data {
        ChartData::Line { points } => {
            let mut table = new_table(&["Bucket", "Value"], no_color);
            for p in points {
                table.add_row(Row::from(vec![p.label.clone(), format_currency(p.value)]));
            }
            table
        }
        ChartData::Bars { bars } | ChartData::Pie { slices: bars } | ChartData::Table { rows: bars } => {
            let mut table = new_table(&["Label", "Value"], no_color);
            for b in bars {
                table.add_row(Row::from(vec![truncate(&b.label, MAX_LABEL), format_thousands(b.value)]));
            }
            table
        }
        ChartData::Weekdays { days } => {
            let mut table = new_table(&["Day", "Average"], no_color);
            for d in days {
                let value = d.value.map(format_currency).unwrap_or_else(|| "-".to_string());
                table.add_row(Row::from(vec![d.day.to_string(), value]));
            }
            table
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        // Char-based so multi-byte item names never split
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================
