//! Record model for cleaned tabular uploads

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CoreError;

/// Known columns of a cleaned upload
///
/// Every column is optional; which ones are present decides which charts
/// and insights can be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Date,
    NetSales,
    GrossSales,
    Price,
    Quantity,
    Item,
    District,
    Type,
    Condition,
    DiningOption,
    Status,
    Town,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Date,
        Column::NetSales,
        Column::GrossSales,
        Column::Price,
        Column::Quantity,
        Column::Item,
        Column::District,
        Column::Type,
        Column::Condition,
        Column::DiningOption,
        Column::Status,
        Column::Town,
    ];

    /// Header name as it appears in the upload
    pub fn name(&self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::NetSales => "Net sales",
            Column::GrossSales => "Gross sales",
            Column::Price => "Price",
            Column::Quantity => "Quantity",
            Column::Item => "Item",
            Column::District => "District",
            Column::Type => "Type",
            Column::Condition => "Condition",
            Column::DiningOption => "Dining option",
            Column::Status => "Status",
            Column::Town => "Town",
        }
    }

    /// Match a (trimmed) header name. Case-sensitive, like the upstream cleaner.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name.trim())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric columns usable as an aggregation metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    NetSales,
    GrossSales,
    Price,
    Quantity,
}

impl Metric {
    pub fn column(&self) -> Column {
        match self {
            Metric::NetSales => Column::NetSales,
            Metric::GrossSales => Column::GrossSales,
            Metric::Price => Column::Price,
            Metric::Quantity => Column::Quantity,
        }
    }
}

/// Categorical columns usable as a grouping dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Item,
    District,
    Type,
    Condition,
    DiningOption,
    Status,
    Town,
}

impl Dimension {
    pub fn column(&self) -> Column {
        match self {
            Dimension::Item => Column::Item,
            Dimension::District => Column::District,
            Dimension::Type => Column::Type,
            Dimension::Condition => Column::Condition,
            Dimension::DiningOption => Column::DiningOption,
            Dimension::Status => Column::Status,
            Dimension::Town => Column::Town,
        }
    }
}

/// Set of columns present in an upload
///
/// Evaluated once per table; every "can this chart be drawn" decision is a
/// lookup here instead of an ad-hoc field check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: BTreeSet<Column>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, column: Column) {
        self.columns.insert(column);
    }

    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn has_all(&self, columns: &[Column]) -> bool {
        columns.iter().all(|c| self.has(*c))
    }

    /// Succeeds when every column is present, otherwise lists the missing ones
    pub fn require(&self, columns: &[Column]) -> Result<(), CoreError> {
        let missing: Vec<&'static str> = columns
            .iter()
            .filter(|c| !self.has(**c))
            .map(|c| c.name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingColumns { missing })
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row of a cleaned upload
///
/// Numeric cells that failed to parse were already coerced to zero at
/// ingestion; `None` means the column was not populated for this row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: Option<NaiveDateTime>,
    pub net_sales: Option<f64>,
    pub gross_sales: Option<f64>,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub item: Option<String>,
    pub district: Option<String>,
    pub kind: Option<String>,
    pub condition: Option<String>,
    pub dining_option: Option<String>,
    pub status: Option<String>,
    pub town: Option<String>,
}

impl Record {
    pub fn new(date: Option<NaiveDateTime>) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        *self.metric_slot(metric) = Some(value);
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        *self.dimension_slot(dimension) = Some(value.into());
        self
    }

    /// Metric value, zero when unpopulated
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::NetSales => self.net_sales,
            Metric::GrossSales => self.gross_sales,
            Metric::Price => self.price,
            Metric::Quantity => self.quantity,
        }
        .unwrap_or(0.0)
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Item => self.item.as_deref(),
            Dimension::District => self.district.as_deref(),
            Dimension::Type => self.kind.as_deref(),
            Dimension::Condition => self.condition.as_deref(),
            Dimension::DiningOption => self.dining_option.as_deref(),
            Dimension::Status => self.status.as_deref(),
            Dimension::Town => self.town.as_deref(),
        }
    }

    pub(crate) fn metric_slot(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::NetSales => &mut self.net_sales,
            Metric::GrossSales => &mut self.gross_sales,
            Metric::Price => &mut self.price,
            Metric::Quantity => &mut self.quantity,
        }
    }

    pub(crate) fn dimension_slot(&mut self, dimension: Dimension) -> &mut Option<String> {
        match dimension {
            Dimension::Item => &mut self.item,
            Dimension::District => &mut self.district,
            Dimension::Type => &mut self.kind,
            Dimension::Condition => &mut self.condition,
            Dimension::DiningOption => &mut self.dining_option,
            Dimension::Status => &mut self.status,
            Dimension::Town => &mut self.town,
        }
    }

    /// Columns this record populates
    pub fn populated_columns(&self) -> impl Iterator<Item = Column> + '_ {
        let metrics = [
            (Column::NetSales, self.net_sales.is_some()),
            (Column::GrossSales, self.gross_sales.is_some()),
            (Column::Price, self.price.is_some()),
            (Column::Quantity, self.quantity.is_some()),
        ];
        let dimensions = [
            (Column::Item, self.item.is_some()),
            (Column::District, self.district.is_some()),
            (Column::Type, self.kind.is_some()),
            (Column::Condition, self.condition.is_some()),
            (Column::DiningOption, self.dining_option.is_some()),
            (Column::Status, self.status.is_some()),
            (Column::Town, self.town.is_some()),
        ];

        std::iter::once((Column::Date, self.date.is_some()))
            .chain(metrics)
            .chain(dimensions)
            .filter_map(|(column, present)| present.then_some(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_roundtrip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
        assert_eq!(Column::from_name(" Net sales "), Some(Column::NetSales));
        assert_eq!(Column::from_name("net sales"), None);
    }

    #[test]
    fn test_schema_require_lists_missing() {
        let schema = Schema::from_columns([Column::Date, Column::Quantity]);

        assert!(schema.require(&[Column::Date]).is_ok());

        match schema.require(&[Column::Item, Column::Quantity, Column::NetSales]) {
            Err(CoreError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Item", "Net sales"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_record_metric_defaults_to_zero() {
        let record = Record::new(None).with_dimension(Dimension::Item, "Latte");
        assert_eq!(record.metric(Metric::NetSales), 0.0);
        assert_eq!(record.dimension(Dimension::Item), Some("Latte"));
        assert_eq!(record.dimension(Dimension::Town), None);
    }

    #[test]
    fn test_populated_columns() {
        let record = Record::new(None)
            .with_metric(Metric::Quantity, 2.0)
            .with_dimension(Dimension::Item, "Tea");
        let columns: Vec<Column> = record.populated_columns().collect();
        assert_eq!(columns, vec![Column::Quantity, Column::Item]);
    }
}
