//! Keyword-matching chat responder
//!
//! Maps a free-text question to a period and one intent, runs it through
//! the analytics pipeline and returns a single formatted answer. This is
//! classification over fixed keyword tables, not a parser.

use serde::Serialize;

use crate::analytics::forecasting::{forecast_revenue, ForecastMethod};
use crate::analytics::insights::{format_rupiah, top_items, total_revenue};
use crate::analytics::period::{select, Period, Scope};
use crate::analytics::trends::daily_totals;
use crate::analytics::AnalyticsConfig;
use crate::error::CoreError;
use crate::models::{Column, Metric, Record, Table};

/// Period keywords, checked in order; first hit wins
const PERIOD_KEYWORDS: [(Period, &[&str]); 5] = [
    (Period::Daily, &["daily", "today"]),
    (Period::Weekly, &["weekly", "week"]),
    (Period::Monthly, &["monthly", "month"]),
    (Period::Quarterly, &["quarterly", "quarter"]),
    (Period::Yearly, &["yearly", "year"]),
];

const RANKING_KEYWORDS: [&str; 5] = ["top", "best", "popular", "highest", "most"];
const SUBJECT_KEYWORDS: [&str; 4] = ["item", "selling", "product", "seller"];
const REVENUE_KEYWORDS: [&str; 4] = ["revenue", "sales", "total", "income"];
const FORECAST_KEYWORDS: [&str; 4] = ["predict", "forecast", "future", "next month"];
const COUNT_KEYWORDS: [&str; 2] = ["how many", "count"];

const HELP_TEXT: &str = "I can answer questions about: Top Items, Total Revenue, Predictions. \
                         Try 'Top selling items daily' or 'Total revenue monthly'.";
const MISSING_ITEM_COLUMNS: &str = "I need 'Item' and 'Quantity' columns to answer that.";
const MISSING_NET_SALES: &str = "I need the 'Net sales' column to answer that.";
const MISSING_FORECAST_COLUMNS: &str = "I need 'Date' and 'Net sales' columns to predict revenue.";
const NO_PREDICTION: &str = "Not enough data for prediction.";

/// What the question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    TopItems,
    Revenue,
    Forecast,
    Count,
    Help,
}

/// Answer plus the classification behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub period: Period,
    /// `None` when the period had no data and no intent ran
    pub intent: Option<Intent>,
    pub text: String,
}

/// Period named in the question, all-time when none is
pub fn detect_period(query: &str) -> Period {
    let query = query.to_lowercase();
    PERIOD_KEYWORDS
        .iter()
        .find(|(_, words)| contains_any(&query, words))
        .map(|(period, _)| *period)
        .unwrap_or(Period::AllTime)
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Answers questions against one table snapshot
pub struct QueryResponder<'a> {
    table: &'a Table,
    config: &'a AnalyticsConfig,
}

impl<'a> QueryResponder<'a> {
    pub fn new(table: &'a Table, config: &'a AnalyticsConfig) -> Self {
        Self { table, config }
    }

    pub fn respond(&self, query: &str) -> ChatAnswer {
        let query = query.to_lowercase();
        let period = detect_period(&query);
        let label = period.label();

        let scope = match select(self.table, period) {
            Ok(scope) => scope,
            Err(CoreError::NoData) => {
                return ChatAnswer {
                    period,
                    intent: None,
                    text: format!(
                        "There are no valid dates in the data, so nothing is available for {} period.",
                        label
                    ),
                };
            }
            Err(e) => {
                return ChatAnswer {
                    period,
                    intent: None,
                    text: e.to_string(),
                };
            }
        };

        if period != Period::AllTime && scope.is_empty() {
            if let Scope::Insufficient {
                history_days,
                required_days,
            } = scope
            {
                tracing::debug!(%period, history_days, required_days, "Chat period has no data");
            }
            return ChatAnswer {
                period,
                intent: None,
                text: format!("No data available for {} period.", label),
            };
        }

        let records = scope.records();
        let (intent, text) = self.dispatch(&query, records, label);
        tracing::debug!(%period, ?intent, "Chat query answered");

        ChatAnswer {
            period,
            intent: Some(intent),
            text,
        }
    }

    /// Intents in fixed priority; the first branch that answers wins
    fn dispatch(&self, query: &str, records: &[&Record], label: &str) -> (Intent, String) {
        let schema = self.table.schema();

        if contains_any(query, &RANKING_KEYWORDS) && contains_any(query, &SUBJECT_KEYWORDS) {
            return (Intent::TopItems, self.answer_top_items(records, label));
        }

        if contains_any(query, &REVENUE_KEYWORDS) {
            let text = match total_revenue(schema, records, Metric::NetSales) {
                Ok(total) => format!("Total Net Sales ({}) is: {}", label, format_rupiah(total)),
                Err(_) => MISSING_NET_SALES.to_string(),
            };
            return (Intent::Revenue, text);
        }

        if contains_any(query, &FORECAST_KEYWORDS) {
            return (Intent::Forecast, self.answer_forecast());
        }

        if contains_any(query, &COUNT_KEYWORDS) {
            return (
                Intent::Count,
                format!("There are {} transactions in ({}).", records.len(), label),
            );
        }

        (Intent::Help, HELP_TEXT.to_string())
    }

    fn answer_top_items(&self, records: &[&Record], label: &str) -> String {
        let top = match top_items(self.table.schema(), records, self.config.top_items_chat) {
            Ok(top) => top,
            Err(_) => return MISSING_ITEM_COLUMNS.to_string(),
        };

        if top.is_empty() {
            return format!("No sales found in {}.", label);
        }

        let mut text = format!("The top selling items ({}) are:", label);
        for (rank, item) in top.iter().enumerate() {
            text.push_str(&format!("\n{}. {} ({:.0})", rank + 1, item.item, item.quantity));
        }
        text
    }

    /// Forecast always looks at the full history
    fn answer_forecast(&self) -> String {
        if !self.table.schema().has_all(&[Column::Date, Column::NetSales]) {
            return MISSING_FORECAST_COLUMNS.to_string();
        }

        let records: Vec<&Record> = self.table.records().iter().collect();
        let forecast = forecast_revenue(&daily_totals(&records, Metric::NetSales), self.config);

        match (forecast.method, forecast.trend) {
            (ForecastMethod::Linear, Some(trend)) => format!(
                "Based on historical trends ({}), I predict the total revenue for the next {} days will be approx **{}**.",
                trend.as_str(),
                forecast.horizon_days,
                format_rupiah(forecast.predicted_total)
            ),
            (ForecastMethod::Naive, _) => format!(
                "Based on the daily average, I predict the total revenue for the next {} days will be approx **{}**.",
                forecast.horizon_days,
                format_rupiah(forecast.predicted_total)
            ),
            _ => forecast
                .unavailable_reason
                .unwrap_or_else(|| NO_PREDICTION.to_string()),
        }
    }
}
