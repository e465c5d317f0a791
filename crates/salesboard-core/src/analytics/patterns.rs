//! Categorical and weekday breakdowns
//!
//! Groupings behind the dashboard's secondary charts: weekday averages,
//! per-dimension sums and means, and value counts.

use chrono::{Datelike, Weekday};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Dimension, Metric, Record};

/// Monday-first display order
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Average metric per row for one weekday
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayAverage {
    pub day: &'static str,
    /// `None` when no row fell on that weekday
    pub value: Option<f64>,
}

/// Group total accumulated in first-seen order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub sum: f64,
    pub rows: usize,
}

impl GroupTotal {
    pub fn mean(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.sum / self.rows as f64
        }
    }
}

/// Mean of the metric per row, bucketed by weekday, always seven entries
pub fn weekday_averages(records: &[&Record], metric: Metric) -> Vec<WeekdayAverage> {
    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];

    for record in records {
        if let Some(ts) = record.date {
            let idx = ts.weekday().num_days_from_monday() as usize;
            sums[idx] += record.metric(metric);
            counts[idx] += 1;
        }
    }

    WEEKDAYS
        .iter()
        .enumerate()
        .map(|(idx, &day)| WeekdayAverage {
            day: weekday_name(day),
            value: (counts[idx] > 0).then(|| sums[idx] / counts[idx] as f64),
        })
        .collect()
}

/// Sum a metric per dimension value, keeping first-seen order
///
/// Rows with no value for the dimension are skipped.
pub fn group_by(records: &[&Record], dimension: Dimension, metric: Option<Metric>) -> Vec<GroupTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal> = Vec::new();

    for record in records {
        let Some(key) = record.dimension(dimension) else {
            continue;
        };

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(GroupTotal {
                key: key.to_string(),
                sum: 0.0,
                rows: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.rows += 1;
        if let Some(metric) = metric {
            group.sum += record.metric(metric);
        }
    }

    groups
}

/// Per-value mean of a metric, first-seen order
pub fn mean_by(records: &[&Record], dimension: Dimension, metric: Metric) -> Vec<(String, f64)> {
    group_by(records, dimension, Some(metric))
        .into_iter()
        .map(|g| {
            let mean = g.mean();
            (g.key, mean)
        })
        .collect()
}

/// Row count per value, most frequent first; ties keep first-seen order
pub fn value_counts(records: &[&Record], dimension: Dimension) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = group_by(records, dimension, None)
        .into_iter()
        .map(|g| (g.key, g.rows))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, dining: Option<&str>, net: f64) -> Record {
        // January 2024: the 1st is a Monday
        let ts = NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0));
        let record = Record::new(ts).with_metric(Metric::NetSales, net);
        match dining {
            Some(option) => record.with_dimension(Dimension::DiningOption, option),
            None => record,
        }
    }

    #[test]
    fn test_weekday_averages_reindex_all_days() {
        let records = [row(1, None, 10.0), row(1, None, 30.0), row(3, None, 7.0)];
        let refs: Vec<&Record> = records.iter().collect();
        let averages = weekday_averages(&refs, Metric::NetSales);

        assert_eq!(averages.len(), 7);
        assert_eq!(averages[0].day, "Monday");
        assert_eq!(averages[0].value, Some(20.0));
        assert_eq!(averages[1].value, None);
        assert_eq!(averages[2].value, Some(7.0));
        assert_eq!(averages[6].day, "Sunday");
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let records = [
            row(1, Some("Take Away"), 5.0),
            row(2, Some("Dine In"), 1.0),
            row(3, None, 100.0),
            row(4, Some("Take Away"), 5.0),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let groups = group_by(&refs, Dimension::DiningOption, Some(Metric::NetSales));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "Take Away");
        assert_eq!(groups[0].sum, 10.0);
        assert_eq!(groups[0].rows, 2);
        assert_eq!(groups[1].key, "Dine In");
    }

    #[test]
    fn test_value_counts_sorted_with_stable_ties() {
        let records = [
            row(1, Some("B"), 0.0),
            row(2, Some("A"), 0.0),
            row(3, Some("C"), 0.0),
            row(4, Some("C"), 0.0),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let counts = value_counts(&refs, Dimension::DiningOption);

        assert_eq!(
            counts,
            vec![
                ("C".to_string(), 2),
                ("B".to_string(), 1),
                ("A".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_mean_by() {
        let records = [row(1, Some("X"), 10.0), row(2, Some("X"), 20.0)];
        let refs: Vec<&Record> = records.iter().collect();
        assert_eq!(
            mean_by(&refs, Dimension::DiningOption, Metric::NetSales),
            vec![("X".to_string(), 15.0)]
        );
    }
}
