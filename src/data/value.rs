//! Column Value Helpers
//! Typed access to DataFrame columns: grouping keys, numbers and dates.

use crate::error::{DashboardError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fmt;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Ordered categorical value used for grouping, pivoting and filtering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Bool(bool),
    Int(i64),
    Date(NaiveDate),
    Text(String),
}

impl GroupKey {
    pub fn text(s: &str) -> Self {
        GroupKey::Text(s.to_string())
    }

    /// Display label, formatting dates with an optional strftime pattern.
    pub fn label(&self, date_format: Option<&str>) -> String {
        match (self, date_format) {
            (GroupKey::Date(d), Some(fmt)) => d.format(fmt).to_string(),
            _ => self.to_string(),
        }
    }

    fn from_any(value: &AnyValue) -> Option<Self> {
        match value {
            AnyValue::Null => None,
            AnyValue::Boolean(b) => Some(GroupKey::Bool(*b)),
            AnyValue::String(s) => text_key(s),
            AnyValue::StringOwned(s) => text_key(s.as_str()),
            AnyValue::Int8(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::Int16(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::Int32(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::Int64(v) => Some(GroupKey::Int(*v)),
            AnyValue::UInt8(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::UInt16(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::UInt32(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::UInt64(v) => Some(GroupKey::Int(*v as i64)),
            AnyValue::Float32(v) => float_key(*v as f64),
            AnyValue::Float64(v) => float_key(*v),
            AnyValue::Date(days) => days_to_date(*days).map(GroupKey::Date),
            other => Some(GroupKey::Text(other.to_string().trim_matches('"').to_string())),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Bool(b) => write!(f, "{}", b),
            GroupKey::Int(v) => write!(f, "{}", v),
            GroupKey::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

fn text_key(s: &str) -> Option<GroupKey> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(GroupKey::Text(trimmed.to_string()))
    }
}

// Spreadsheets store years as floats; 2023.0 must group with 2023.
fn float_key(v: f64) -> Option<GroupKey> {
    if v.is_nan() {
        None
    } else if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(GroupKey::Int(v as i64))
    } else {
        Some(GroupKey::Text(v.to_string()))
    }
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_CE_DAYS)?)
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

/// Look up a column, reporting a missing one as a field error.
pub fn require_column<'a>(df: &'a DataFrame, dataset: &str, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| DashboardError::missing_column(dataset, name))
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Grouping keys of a column, `None` where the value is absent.
pub fn column_keys(df: &DataFrame, dataset: &str, name: &str) -> Result<Vec<Option<GroupKey>>> {
    let column = require_column(df, dataset, name)?;
    let mut keys = Vec::with_capacity(column.len());
    for i in 0..column.len() {
        let value = column.get(i)?;
        keys.push(GroupKey::from_any(&value));
    }
    Ok(keys)
}

/// Sorted distinct keys of a column.
pub fn distinct_keys(df: &DataFrame, dataset: &str, name: &str) -> Result<Vec<GroupKey>> {
    let keys: BTreeSet<GroupKey> = column_keys(df, dataset, name)?
        .into_iter()
        .flatten()
        .collect();
    Ok(keys.into_iter().collect())
}

/// Numeric values of a column; nulls, NaN and non-numeric values are `None`.
pub fn column_f64(df: &DataFrame, dataset: &str, name: &str) -> Result<Vec<Option<f64>>> {
    let column = require_column(df, dataset, name)?;
    let values = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(parse_f64_lenient)
            .collect(),
        _ => {
            let cast = column.cast(&DataType::Float64).map_err(|e| {
                DashboardError::field(dataset, name, format!("is not numeric ({})", e))
            })?;
            cast.f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect()
        }
    };
    Ok(values)
}

/// Parsed values only, in row order.
pub fn present_f64(df: &DataFrame, dataset: &str, name: &str) -> Result<Vec<f64>> {
    Ok(column_f64(df, dataset, name)?.into_iter().flatten().collect())
}

/// Calendar dates of a `Date` column.
pub fn column_dates(df: &DataFrame, dataset: &str, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let column = require_column(df, dataset, name)?;
    if column.dtype() != &DataType::Date {
        return Err(DashboardError::field(dataset, name, "is not a date column"));
    }
    let days = column.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(days_to_date))
        .collect())
}

/// Build a `Date` column from calendar dates.
pub fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> Result<Column> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}

/// Parse a number the way spreadsheet exports write them: trimmed, with
/// thousands separators and an optional trailing percent sign.
pub fn parse_f64_lenient(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.strip_suffix('%').unwrap_or(s).trim();
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Month number from a name ("October", "oct") or a number ("10").
pub fn parse_month(s: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let s = s.trim();
    if let Ok(n) = s.parse::<f64>() {
        let n = n as u32;
        return (1..=12).contains(&n).then_some(n);
    }
    let prefix: String = s.chars().take(3).collect::<String>().to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}

pub fn month_abbrev(month: u32) -> &'static str {
    const ABBREV: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    ABBREV
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("???")
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
