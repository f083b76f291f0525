//! Aggregate Result Types
//! Outputs of the aggregator, consumed by chart binding and the report view.

use crate::config::MetricKind;
use crate::data::GroupKey;

/// One group of a grouped aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub keys: Vec<GroupKey>,
    /// One value per metric, in metric order.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouped {
    pub keys: Vec<String>,
    pub metrics: Vec<String>,
    pub rows: Vec<GroupRow>,
}

impl Grouped {
    /// Values of one metric across groups.
    pub fn metric_values(&self, metric: &str) -> Option<Vec<f64>> {
        let idx = self.metrics.iter().position(|m| m == metric)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Look up a single group's metric by its single key.
    pub fn get(&self, key: &GroupKey, metric: &str) -> Option<f64> {
        let idx = self.metrics.iter().position(|m| m == metric)?;
        self.rows
            .iter()
            .find(|r| r.keys.first() == Some(key))
            .map(|r| r.values[idx])
    }
}

/// Row key x column key matrix. Every cell is present.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub row_name: String,
    pub column_name: String,
    pub rows: Vec<GroupKey>,
    pub columns: Vec<GroupKey>,
    /// `cells[r][c]`
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn cell(&self, row: &GroupKey, column: &GroupKey) -> Option<f64> {
        let r = self.rows.iter().position(|k| k == row)?;
        let c = self.columns.iter().position(|k| k == column)?;
        Some(self.cells[r][c])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub op: MetricKind,
    /// (column, value) in configured column order.
    pub entries: Vec<(String, f64)>,
}

/// Five-number box summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub column: String,
    pub bins: Vec<HistogramBin>,
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl Default for ColumnSummary {
    fn default() -> Self {
        Self {
            column: String::new(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    Grouped(Grouped),
    Pivot(Pivot),
    Correlation(Correlation),
    Totals(Totals),
    Distribution(Vec<BoxSummary>),
    Histogram(Histogram),
}

impl AggregateResult {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Grouped(_) => "grouped",
            Self::Pivot(_) => "pivot",
            Self::Correlation(_) => "correlation",
            Self::Totals(_) => "totals",
            Self::Distribution(_) => "distribution",
            Self::Histogram(_) => "histogram",
        }
    }
}
