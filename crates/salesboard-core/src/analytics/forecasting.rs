//! Revenue forecasting with linear regression
//!
//! Fits an ordinary least-squares line to daily revenue and sums its
//! predictions over the forecast horizon. Short histories fall back to a
//! naive projection of the daily mean.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use super::AnalyticsConfig;

/// Forecast data with predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastData {
    /// Sum of predicted revenue over the horizon
    pub predicted_total: f64,
    /// Direction of the fitted line (linear method only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    /// Revenue change per day (linear method only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    /// R² of the fit, 0.0-1.0
    pub confidence: f64,
    pub method: ForecastMethod,
    /// Distinct calendar days behind the forecast
    pub days_observed: usize,
    pub horizon_days: u32,
    /// Reason if unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

/// Sign of the fitted slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Upward,
    /// Also used for a flat line
    Downward,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upward => "upward",
            Self::Downward => "downward",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMethod {
    /// OLS on day ordinals
    Linear,
    /// Daily mean times horizon
    Naive,
    Unavailable,
}

impl ForecastData {
    /// Create unavailable forecast with reason
    pub fn unavailable(reason: &str) -> Self {
        Self {
            predicted_total: 0.0,
            trend: None,
            slope: None,
            confidence: 0.0,
            method: ForecastMethod::Unavailable,
            days_observed: 0,
            horizon_days: 0,
            unavailable_reason: Some(reason.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.method != ForecastMethod::Unavailable
    }
}

/// Forecast revenue over the configured horizon
///
/// # Returns
/// - `ForecastData::unavailable()` when there are no dated days
/// - naive `mean(daily) * horizon` below `forecast_min_days` distinct days
/// - linear projection otherwise, summed over the days after the last one
pub fn forecast_revenue(daily: &BTreeMap<NaiveDate, f64>, config: &AnalyticsConfig) -> ForecastData {
    let Some((&last_day, _)) = daily.last_key_value() else {
        return ForecastData::unavailable("Not enough data for prediction.");
    };

    let horizon = config.forecast_horizon_days;
    let days_observed = daily.len();

    if days_observed < config.forecast_min_days {
        let mean = daily.values().sum::<f64>() / days_observed as f64;
        return ForecastData {
            predicted_total: mean * horizon as f64,
            trend: None,
            slope: None,
            confidence: 0.0,
            method: ForecastMethod::Naive,
            days_observed,
            horizon_days: horizon,
            unavailable_reason: None,
        };
    }

    let points: Vec<(f64, f64)> = daily
        .iter()
        .map(|(day, &revenue)| (day_ordinal(*day), revenue))
        .collect();

    let (slope, intercept, r_squared) = linear_regression(&points);

    let last_x = day_ordinal(last_day);
    let predicted_total: f64 = (1..=horizon)
        .map(|offset| slope * (last_x + offset as f64) + intercept)
        .sum();

    let trend = if slope > 0.0 {
        TrendDirection::Upward
    } else {
        TrendDirection::Downward
    };

    tracing::debug!(
        days_observed,
        slope,
        r_squared,
        predicted_total,
        "Revenue forecast fitted"
    );

    ForecastData {
        predicted_total,
        trend: Some(trend),
        slope: Some(slope),
        confidence: r_squared.clamp(0.0, 1.0),
        method: ForecastMethod::Linear,
        days_observed,
        horizon_days: horizon,
        unavailable_reason: None,
    }
}

fn day_ordinal(day: NaiveDate) -> f64 {
    day.num_days_from_ce() as f64
}

/// Simple linear regression with R² calculation
///
/// Sums are taken around the means; raw day ordinals are large enough to
/// lose precision in `n * sum_xx - sum_x²`.
///
/// # Returns
/// (slope, intercept, r_squared)
fn linear_regression(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| {
            let predicted = slope * p.0 + intercept;
            (p.1 - predicted).powi(2)
        })
        .sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - (ss_res / ss_tot)
    } else {
        0.0
    };

    (slope, intercept, r_squared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(values: &[f64]) -> BTreeMap<NaiveDate, f64> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_empty_is_unavailable() {
        let forecast = forecast_revenue(&BTreeMap::new(), &AnalyticsConfig::default());
        assert!(!forecast.is_available());
        assert!(forecast.unavailable_reason.is_some());
    }

    #[test]
    fn test_naive_projection_below_five_days() {
        let forecast = forecast_revenue(&series(&[10.0, 20.0, 30.0, 40.0]), &AnalyticsConfig::default());
        assert_eq!(forecast.method, ForecastMethod::Naive);
        assert!((forecast.predicted_total - 25.0 * 30.0).abs() < 1e-9);
        assert!(forecast.trend.is_none());
    }

    #[test]
    fn test_increasing_series_is_upward() {
        let forecast = forecast_revenue(
            &series(&[100.0, 120.0, 150.0, 160.0, 200.0]),
            &AnalyticsConfig::default(),
        );
        assert_eq!(forecast.method, ForecastMethod::Linear);
        assert_eq!(forecast.trend, Some(TrendDirection::Upward));
        assert!(forecast.slope.unwrap() > 0.0);
    }

    #[test]
    fn test_perfect_line_extrapolates() {
        // y = 10x + 100 over five days; next 30 days sum to
        // sum_{k=5}^{34} (10k + 100) = 10 * 585 + 3000
        let forecast = forecast_revenue(
            &series(&[100.0, 110.0, 120.0, 130.0, 140.0]),
            &AnalyticsConfig::default(),
        );
        assert!((forecast.slope.unwrap() - 10.0).abs() < 1e-6);
        assert!((forecast.predicted_total - 8850.0).abs() < 1e-4);
        assert!((forecast.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series_reports_downward() {
        let forecast = forecast_revenue(&series(&[50.0; 8]), &AnalyticsConfig::default());
        assert_eq!(forecast.trend, Some(TrendDirection::Downward));
        assert!((forecast.predicted_total - 1500.0).abs() < 1e-6);
        assert_eq!(forecast.confidence, 0.0);
    }

    #[test]
    fn test_gaps_use_calendar_ordinals() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let daily: BTreeMap<NaiveDate, f64> = [0, 1, 2, 10, 20]
            .iter()
            .map(|&offset| (start + Duration::days(offset), offset as f64))
            .collect();
        let forecast = forecast_revenue(&daily, &AnalyticsConfig::default());
        assert!((forecast.slope.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_horizon() {
        let config = AnalyticsConfig {
            forecast_horizon_days: 7,
            ..AnalyticsConfig::default()
        };
        let forecast = forecast_revenue(&series(&[10.0, 10.0]), &config);
        assert_eq!(forecast.horizon_days, 7);
        assert!((forecast.predicted_total - 70.0).abs() < 1e-9);
    }
}
