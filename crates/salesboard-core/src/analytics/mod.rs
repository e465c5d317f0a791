//! Period analytics for sales reporting
//!
//! Period resolution, time series aggregation, anomaly detection,
//! forecasting and rule-based insights over an uploaded table.

use serde::{Deserialize, Serialize};

pub mod anomalies;
pub mod dashboard;
pub mod forecasting;
pub mod insights;
pub mod patterns;
pub mod period;
pub mod trends;


pub use anomalies::{detect_anomalies, Anomaly, AnomalySeverity};
pub use dashboard::{Bar, Chart, ChartData, DashboardReport, ReportStatus};
pub use forecasting::{forecast_revenue, ForecastData, ForecastMethod, TrendDirection};
pub use insights::{
    format_currency, format_rupiah, format_thousands, generate_summary, item_quantities,
    recommendations, summarize, top_items, total_revenue, Insights, ItemRank,
};
pub use patterns::{mean_by, value_counts, weekday_averages, GroupTotal, WeekdayAverage};
pub use period::{resolve, select, Granularity, Period, Resolution, Scope, Window};
pub use trends::{aggregate, aggregate_with, daily_totals, Aggregation, BucketKey, SeriesPoint, TrendSeries};

/// Tunables for the insight engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Items listed in chat answers
    pub top_items_chat: usize,
    /// Items in the dashboard bar chart
    pub top_items_dashboard: usize,
    /// |z| above which a day is flagged
    pub anomaly_threshold: f64,
    /// |z| above which a flagged day is critical
    pub critical_threshold: f64,
    pub forecast_horizon_days: u32,
    /// Distinct days needed before fitting a line
    pub forecast_min_days: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_items_chat: 3,
            top_items_dashboard: 5,
            anomaly_threshold: 2.0,
            critical_threshold: 3.0,
            forecast_horizon_days: 30,
            forecast_min_days: 5,
        }
    }
}
