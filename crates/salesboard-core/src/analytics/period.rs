//! Period resolution
//!
//! Turns a requested reporting period into a concrete date window, after
//! checking that the table holds enough history for that period.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::{Record, Table};

/// Reporting period requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
    AllTime,
}

/// Sub-granularity used for bucketing inside a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Hour of day (0-23)
    Hour,
    /// Calendar day
    Day,
    /// ISO week, keyed by its Monday
    Week,
    /// Calendar month
    Month,
}

/// How a period derives its window start from the latest date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowRule {
    /// Calendar day of the latest date
    LatestDay,
    /// The N calendar days ending on the latest date
    TrailingDays(u64),
    /// Calendar month containing the latest date
    CalendarMonth,
    /// Rolling N months back from the latest timestamp
    TrailingMonths(u32),
    /// Whole table
    Everything,
}

/// Fixed per-period rules
struct PeriodRule {
    period: Period,
    keyword: &'static str,
    label: &'static str,
    min_required_days: i64,
    granularity: Granularity,
    window: WindowRule,
}

/// Indexed by `Period as usize`
static PERIOD_RULES: [PeriodRule; 7] = [
    PeriodRule {
        period: Period::Daily,
        keyword: "daily",
        label: "Daily",
        min_required_days: 0,
        granularity: Granularity::Hour,
        window: WindowRule::LatestDay,
    },
    PeriodRule {
        period: Period::Weekly,
        keyword: "weekly",
        label: "Weekly",
        min_required_days: 6,
        granularity: Granularity::Day,
        window: WindowRule::TrailingDays(7),
    },
    PeriodRule {
        period: Period::Monthly,
        keyword: "monthly",
        label: "Monthly",
        min_required_days: 27,
        granularity: Granularity::Day,
        window: WindowRule::CalendarMonth,
    },
    PeriodRule {
        period: Period::Quarterly,
        keyword: "quarterly",
        label: "Quarterly",
        min_required_days: 88,
        granularity: Granularity::Week,
        window: WindowRule::TrailingMonths(3),
    },
    PeriodRule {
        period: Period::HalfYearly,
        keyword: "half-yearly",
        label: "Half-Yearly",
        min_required_days: 178,
        granularity: Granularity::Week,
        window: WindowRule::TrailingMonths(6),
    },
    PeriodRule {
        period: Period::Yearly,
        keyword: "yearly",
        label: "Yearly",
        min_required_days: 360,
        granularity: Granularity::Month,
        window: WindowRule::TrailingMonths(12),
    },
    PeriodRule {
        period: Period::AllTime,
        keyword: "all-time",
        label: "All Time",
        min_required_days: 0,
        granularity: Granularity::Week,
        window: WindowRule::Everything,
    },
];

/// Extra spellings accepted by `FromStr`
const PERIOD_ALIASES: [(&str, Period); 6] = [
    ("3month", Period::Quarterly),
    ("6month", Period::HalfYearly),
    ("halfyearly", Period::HalfYearly),
    ("half_yearly", Period::HalfYearly),
    ("all", Period::AllTime),
    ("all_time", Period::AllTime),
];

impl Period {
    pub const ALL: [Period; 7] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Quarterly,
        Period::HalfYearly,
        Period::Yearly,
        Period::AllTime,
    ];

    fn rule(self) -> &'static PeriodRule {
        let rule = &PERIOD_RULES[self as usize];
        debug_assert_eq!(rule.period, self);
        rule
    }

    /// Minimum history (in whole days) the table must span
    pub fn min_required_days(self) -> i64 {
        self.rule().min_required_days
    }

    /// Bucket granularity used for this period's trend
    pub fn granularity(self) -> Granularity {
        self.rule().granularity
    }

    /// Human label ("Half-Yearly", "All Time")
    pub fn label(self) -> &'static str {
        self.rule().label
    }

    /// Canonical keyword ("half-yearly", "all-time")
    pub fn keyword(self) -> &'static str {
        self.rule().keyword
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();

        PERIOD_RULES
            .iter()
            .map(|rule| (rule.keyword, rule.period))
            .chain(PERIOD_ALIASES)
            .find(|(keyword, _)| *keyword == needle)
            .map(|(_, period)| period)
            .ok_or_else(|| CoreError::UnknownPeriod {
                input: s.to_string(),
                expected: PERIOD_RULES
                    .iter()
                    .map(|rule| rule.keyword)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Concrete window with inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub period: Period,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub granularity: Granularity,
}

impl Window {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Records whose date falls inside the window (undated rows never do)
    pub fn select<'a>(&self, table: &'a Table) -> Vec<&'a Record> {
        table
            .records()
            .iter()
            .filter(|r| r.date.is_some_and(|d| self.contains(d)))
            .collect()
    }

    /// Number of calendar days the window touches
    pub fn span_days(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }
}

/// Outcome of resolving a period against a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// Enough history; window to aggregate over
    Window(Window),
    /// Not enough history for the requested period
    Empty {
        period: Period,
        history_days: i64,
        required_days: i64,
    },
}

impl Resolution {
    pub fn window(&self) -> Option<&Window> {
        match self {
            Resolution::Window(w) => Some(w),
            Resolution::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Resolution::Empty { .. })
    }
}

/// Resolve a period into a window
///
/// # Errors
/// `CoreError::NoData` when the table has no valid dates.
///
/// # Returns
/// `Resolution::Empty` when `history_days < min_required_days` for the
/// period. Otherwise a window clamped to the table's date span.
pub fn resolve(table: &Table, period: Period) -> Result<Resolution, CoreError> {
    let (earliest, latest) = table.date_span().ok_or(CoreError::NoData)?;
    let history_days = (latest - earliest).num_days();
    let required_days = period.min_required_days();

    if history_days < required_days {
        tracing::debug!(
            %period,
            history_days,
            required_days,
            "Insufficient history for period"
        );
        return Ok(Resolution::Empty {
            period,
            history_days,
            required_days,
        });
    }

    let start = match period.rule().window {
        WindowRule::LatestDay => start_of_day(latest.date()),
        WindowRule::TrailingDays(days) => latest
            .date()
            .checked_sub_signed(Duration::days(days as i64 - 1))
            .map(start_of_day)
            .unwrap_or(earliest),
        WindowRule::CalendarMonth => start_of_day(first_of_month(latest.date())),
        WindowRule::TrailingMonths(months) => latest
            .checked_sub_months(Months::new(months))
            .unwrap_or(earliest),
        WindowRule::Everything => earliest,
    };

    Ok(Resolution::Window(Window {
        period,
        start: start.max(earliest),
        end: latest,
        granularity: period.granularity(),
    }))
}

/// Records in scope for a period
///
/// All-time covers the whole table, including undated rows, and works even
/// without a `Date` column. Every other period goes through [`resolve`].
#[derive(Debug, Clone)]
pub enum Scope<'a> {
    Records {
        window: Option<Window>,
        records: Vec<&'a Record>,
    },
    Insufficient {
        history_days: i64,
        required_days: i64,
    },
}

impl<'a> Scope<'a> {
    pub fn records(&self) -> &[&'a Record] {
        match self {
            Scope::Records { records, .. } => records,
            Scope::Insufficient { .. } => &[],
        }
    }

    pub fn window(&self) -> Option<&Window> {
        match self {
            Scope::Records { window, .. } => window.as_ref(),
            Scope::Insufficient { .. } => None,
        }
    }

    /// True when nothing is in scope, whether from short history or an empty window
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Resolve a period and collect the records it covers
pub fn select(table: &Table, period: Period) -> Result<Scope<'_>, CoreError> {
    if period == Period::AllTime {
        let window = match resolve(table, period) {
            Ok(resolution) => resolution.window().copied(),
            Err(CoreError::NoData) => None,
            Err(e) => return Err(e),
        };
        return Ok(Scope::Records {
            window,
            records: table.records().iter().collect(),
        });
    }

    match resolve(table, period)? {
        Resolution::Window(window) => Ok(Scope::Records {
            records: window.select(table),
            window: Some(window),
        }),
        Resolution::Empty {
            history_days,
            required_days,
            ..
        } => Ok(Scope::Insufficient {
            history_days,
            required_days,
        }),
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
