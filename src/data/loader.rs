//! Dataset Loader Module
//! Reads spreadsheets (calamine) and delimited files (Polars) into a DataFrame.

use crate::data::value::date_column;
use crate::error::{DashboardError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Supported input formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Workbook,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(SourceFormat::Csv),
            "tsv" => Some(SourceFormat::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }
}

/// Loads one table from a file, optionally from a named sheet.
pub struct DataLoader;

impl DataLoader {
    /// Load a table. `dataset` only names the table in error messages.
    pub fn load(dataset: &str, path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
        if !path.is_file() {
            return Err(DashboardError::source(dataset, path, "file not found"));
        }
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| DashboardError::source(dataset, path, "unsupported file format"))?;

        let df = match format {
            SourceFormat::Csv => Self::load_delimited(dataset, path, b',')?,
            SourceFormat::Tsv => Self::load_delimited(dataset, path, b'\t')?,
            SourceFormat::Workbook => Self::load_workbook(dataset, path, sheet)?,
        };
        tracing::info!(
            "Loaded {} ({} rows, {} columns) from {}",
            dataset,
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df)
    }

    /// Load a delimited file using Polars. Every column is read as text; the
    /// cleaner owns type coercion and its invalid-value policies.
    fn load_delimited(dataset: &str, path: &Path, separator: u8) -> Result<DataFrame> {
        LazyCsvReader::new(path)
            .with_separator(separator)
            .with_infer_schema_length(Some(0))
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|e| DashboardError::source(dataset, path, e))
    }

    /// Load one sheet of a workbook; the first row is the header.
    fn load_workbook(dataset: &str, path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| DashboardError::source(dataset, path, e))?;
        let sheet_names = workbook.sheet_names();

        let sheet_name = match sheet {
            Some(name) => {
                if !sheet_names.iter().any(|s| s == name) {
                    return Err(DashboardError::source(
                        dataset,
                        path,
                        format!(
                            "sheet '{}' not found (available: {})",
                            name,
                            sheet_names.join(", ")
                        ),
                    ));
                }
                name.to_string()
            }
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| DashboardError::source(dataset, path, "workbook has no sheets"))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| DashboardError::source(dataset, path, e))?;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Err(DashboardError::source(
                dataset,
                path,
                format!("sheet '{}' is empty", sheet_name),
            ));
        };
        let names = header_names(header);
        let body: Vec<Vec<SheetCell>> = rows
            .map(|row| row.iter().map(SheetCell::from_data).collect())
            .collect();

        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let cells: Vec<&SheetCell> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&SheetCell::Empty))
                .collect();
            columns.push(build_column(name, &cells)?);
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// A workbook cell reduced to the types the cleaner understands.
#[derive(Debug, Clone, PartialEq)]
enum SheetCell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl SheetCell {
    fn from_data(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => SheetCell::Empty,
            Data::Int(i) => SheetCell::Number(*i as f64),
            Data::Float(f) => SheetCell::Number(*f),
            Data::Bool(b) => SheetCell::Text(b.to_string()),
            Data::String(s) if s.trim().is_empty() => SheetCell::Empty,
            Data::String(s) => SheetCell::Text(s.clone()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(value) => SheetCell::Date(value.date()),
                None => SheetCell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => match s.get(..10).and_then(|d| d.parse().ok()) {
                Some(date) => SheetCell::Date(date),
                None => SheetCell::Text(s.clone()),
            },
            other => SheetCell::Text(other.to_string()),
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            SheetCell::Empty => None,
            SheetCell::Number(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
                Some(format!("{}", *v as i64))
            }
            SheetCell::Number(v) => Some(v.to_string()),
            SheetCell::Text(s) => Some(s.clone()),
            SheetCell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Header names with pandas-style placeholders for blanks and suffixes for duplicates.
fn header_names(header: &[Data]) -> Vec<String> {
    let raw: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match SheetCell::from_data(cell).as_text() {
            Some(text) => text.trim().to_string(),
            None => format!("Unnamed: {}", idx),
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .map(|name| {
            if taken.insert(name.clone()) {
                return name;
            }
            let n = suffixes.entry(name.clone()).or_insert(0);
            loop {
                *n += 1;
                let candidate = format!("{}.{}", name, n);
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Infer one column type from its cells: numbers, dates, or text.
fn build_column(name: &str, cells: &[&SheetCell]) -> Result<Column> {
    let present = || cells.iter().filter(|c| !matches!(c, SheetCell::Empty));

    if present().all(|c| matches!(c, SheetCell::Number(_))) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                SheetCell::Number(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Ok(Column::new(name.into(), values));
    }

    if present().all(|c| matches!(c, SheetCell::Date(_))) {
        let dates: Vec<Option<NaiveDate>> = cells
            .iter()
            .map(|c| match c {
                SheetCell::Date(d) => Some(*d),
                _ => None,
            })
            .collect();
        return date_column(name, &dates);
    }

    let values: Vec<Option<String>> = cells.iter().map(|c| c.as_text()).collect();
    Ok(Column::new(name.into(), values))
}
