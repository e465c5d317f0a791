//! Anomaly detection for unusual daily revenue
//!
//! Uses Z-score analysis over per-day revenue totals to flag days that
//! deviate significantly from the rest of the series.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::AnalyticsConfig;

/// Severity level for anomalies based on standard deviations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// Beyond the critical threshold (3σ by default)
    Critical,
    /// Beyond the warning threshold (2σ by default)
    Warning,
}

impl AnomalySeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
        }
    }
}

/// Detected anomaly with context
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    /// Revenue on that day
    pub value: f64,
    /// Z-score (number of standard deviations from mean)
    pub z_score: f64,
    /// Deviation percentage from mean
    pub deviation_pct: f64,
    pub severity: AnomalySeverity,
}

impl Anomaly {
    /// Format deviation as percentage with sign
    pub fn format_deviation(&self) -> String {
        let sign = if self.deviation_pct >= 0.0 { "+" } else { "" };
        format!("{}{:.0}%", sign, self.deviation_pct)
    }
}

/// Statistical summary for anomaly detection
#[derive(Debug, Clone)]
struct Statistics {
    mean: f64,
    std_dev: f64,
}

impl Statistics {
    /// Population mean and standard deviation
    fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    fn z_score(&self, value: f64) -> f64 {
        if self.std_dev == 0.0 {
            return 0.0;
        }
        (value - self.mean) / self.std_dev
    }

    fn deviation_pct(&self, value: f64) -> f64 {
        if self.mean == 0.0 {
            return 0.0;
        }
        ((value - self.mean) / self.mean) * 100.0
    }
}

/// Detect days with unusual revenue
///
/// # Algorithm
/// - Mean (μ) and population standard deviation (σ) over all days
/// - Flag days where |x - μ| > threshold × σ
/// - A constant series (σ = 0) has no anomalies
///
/// # Returns
/// Anomalies sorted by severity (critical first), then by |z| descending
pub fn detect_anomalies(daily: &BTreeMap<NaiveDate, f64>, config: &AnalyticsConfig) -> Vec<Anomaly> {
    let values: Vec<f64> = daily.values().copied().collect();

    let Some(stats) = Statistics::compute(&values) else {
        return vec![];
    };
    if stats.std_dev == 0.0 {
        return vec![];
    }

    let mut anomalies: Vec<Anomaly> = daily
        .iter()
        .filter_map(|(&date, &value)| {
            let z_score = stats.z_score(value);
            let abs_z = z_score.abs();
            if abs_z <= config.anomaly_threshold {
                return None;
            }

            let severity = if abs_z > config.critical_threshold {
                AnomalySeverity::Critical
            } else {
                AnomalySeverity::Warning
            };

            Some(Anomaly {
                date,
                value,
                z_score,
                deviation_pct: stats.deviation_pct(value),
                severity,
            })
        })
        .collect();

    anomalies.sort_by(|a, b| match (a.severity, b.severity) {
        (AnomalySeverity::Critical, AnomalySeverity::Warning) => std::cmp::Ordering::Less,
        (AnomalySeverity::Warning, AnomalySeverity::Critical) => std::cmp::Ordering::Greater,
        _ => b
            .z_score
            .abs()
            .partial_cmp(&a.z_score.abs())
            .unwrap_or(std::cmp::Ordering::Equal),
    });

    anomalies
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
    fn test_empty_series() {
        assert!(detect_anomalies(&BTreeMap::new(), &AnalyticsConfig::default()).is_empty());
    }

    #[test]
    fn test_constant_series_has_no_anomalies() {
        let anomalies = detect_anomalies(&series(&[100.0; 40]), &AnalyticsConfig::default());
        assert_eq!(anomalies.len(), 0);
    }

    #[test]
    fn test_single_spike_is_critical() {
        let mut values = vec![100.0; 20];
        values[12] = 1000.0;
        let anomalies = detect_anomalies(&series(&values), &AnalyticsConfig::default());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Critical);
        assert_eq!(anomalies[0].date, NaiveDate::from_ymd_opt(2024, 1, 13).unwrap());
        assert!(anomalies[0].z_score > 3.0);
        assert!(anomalies[0].format_deviation().starts_with('+'));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Two points: each is exactly one σ from the mean
        let anomalies = detect_anomalies(
            &series(&[0.0, 10.0]),
            &AnalyticsConfig {
                anomaly_threshold: 1.0,
                ..AnalyticsConfig::default()
            },
        );
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_critical_sorted_first() {
        let mut values = vec![100.0; 30];
        values[3] = 160.0;
        values[20] = 400.0;
        let anomalies = detect_anomalies(&series(&values), &AnalyticsConfig::default());

        assert!(anomalies.len() >= 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Critical);
        assert_eq!(anomalies[0].value, 400.0);
    }
}
