//! Data Cleaner Module
//! Turns a raw table into a Dataset: source-specific preparation, empty column
//! removal, required column checks, type coercion and derived columns.

use crate::config::{DeriveSpec, FieldSpec, InvalidPolicy, PrepareStep, SourceConfig};
use crate::data::filter::retain_rows;
use crate::data::value::{
    column_dates, column_f64, column_keys, date_column, first_of_month, has_column, month_abbrev,
    parse_f64_lenient, parse_month, require_column, GroupKey,
};
use crate::error::{DashboardError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Policy for unparseable date values when the source does not choose one.
pub const DEFAULT_DATE_POLICY: InvalidPolicy = InvalidPolicy::DropRow;
/// Policy for unparseable numeric values when the source does not choose one.
pub const DEFAULT_NUMBER_POLICY: InvalidPolicy = InvalidPolicy::Null;

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y", "%d %B %Y", "%B %d, %Y",
];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// What cleaning did to a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_columns: Vec<String>,
    /// Rows removed per column under the drop-row policy.
    pub dropped_rows: BTreeMap<String, usize>,
    /// Values set to null per column under the null policy.
    pub nulled_values: BTreeMap<String, usize>,
}

/// A cleaned, immutable table.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub frame: DataFrame,
    pub report: CleanReport,
}

impl Dataset {
    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Handles data cleaning and transformation operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Run every cleaning step of a source over a raw table.
    pub fn clean(dataset: &str, raw: DataFrame, source: &SourceConfig) -> Result<Dataset> {
        let mut report = CleanReport {
            rows_in: raw.height(),
            ..Default::default()
        };

        let df = Self::prepare(dataset, raw, &source.prepare)?;
        let (df, dropped) = Self::drop_empty_columns(df)?;
        report.dropped_columns = dropped;
        Self::check_required(dataset, &df, &source.required)?;

        let mut df = df;
        for field in &source.dates {
            df = Self::coerce_dates(dataset, df, field, &mut report)?;
        }
        for field in &source.numbers {
            df = Self::coerce_numbers(dataset, df, field, &mut report)?;
        }
        for spec in &source.derive {
            df = Self::derive(dataset, df, spec)?;
        }

        report.rows_out = df.height();
        if !report.dropped_rows.is_empty() || !report.nulled_values.is_empty() {
            tracing::warn!(
                "{}: dropped rows {:?}, nulled values {:?}",
                dataset,
                report.dropped_rows,
                report.nulled_values
            );
        }
        tracing::info!(
            "Cleaned {}: {} -> {} rows, dropped empty columns {:?}",
            dataset,
            report.rows_in,
            report.rows_out,
            report.dropped_columns
        );

        Ok(Dataset {
            name: dataset.to_string(),
            frame: df,
            report,
        })
    }

    /// Apply source-specific reshaping steps in order.
    pub fn prepare(dataset: &str, mut df: DataFrame, steps: &[PrepareStep]) -> Result<DataFrame> {
        for step in steps {
            df = match step {
                PrepareStep::DropColumns { columns } => {
                    let keep: Vec<String> = df
                        .get_column_names()
                        .iter()
                        .map(|c| c.to_string())
                        .filter(|c| !columns.contains(c))
                        .collect();
                    df.select(keep)?
                }
                PrepareStep::StripParenthetical { column } => {
                    let col = require_column(&df, dataset, column)?;
                    if col.dtype() == &DataType::String {
                        let values: Vec<Option<String>> = col
                            .str()?
                            .into_iter()
                            .map(|v| v.map(strip_parenthetical))
                            .collect();
                        df.with_column(Column::new(column.as_str().into(), values))?;
                    }
                    df
                }
                PrepareStep::SetColumnNames { names } => {
                    if names.len() != df.width() {
                        return Err(DashboardError::field(
                            dataset,
                            "column names",
                            format!("expected {} columns, found {}", names.len(), df.width()),
                        ));
                    }
                    df.set_column_names(names.iter().map(String::as_str))?;
                    df
                }
            };
        }
        Ok(df)
    }

    /// Drop every column whose values are all absent. Returns the dropped names.
    pub fn drop_empty_columns(df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        if df.height() == 0 {
            return Ok((df, Vec::new()));
        }
        let (empty, keep): (Vec<&Column>, Vec<&Column>) = df
            .get_columns()
            .iter()
            .partition(|col| col.null_count() == col.len());
        if empty.is_empty() {
            return Ok((df, Vec::new()));
        }

        let dropped: Vec<String> = empty.iter().map(|c| c.name().to_string()).collect();
        let keep: Vec<String> = keep.iter().map(|c| c.name().to_string()).collect();
        Ok((df.select(keep)?, dropped))
    }

    /// Fail on the first required column that is not present.
    pub fn check_required(dataset: &str, df: &DataFrame, required: &[String]) -> Result<()> {
        match required.iter().find(|name| !has_column(df, name)) {
            Some(missing) => Err(DashboardError::missing_column(dataset, missing)),
            None => Ok(()),
        }
    }

    /// Convert a column to calendar dates. Blank cells stay null; only present
    /// values that fail to parse are subject to the policy.
    pub fn coerce_dates(
        dataset: &str,
        df: DataFrame,
        field: &FieldSpec,
        report: &mut CleanReport,
    ) -> Result<DataFrame> {
        let name = field.column.as_str();
        let column = require_column(&df, dataset, name)?;

        let parsed: Vec<Option<NaiveDate>> = match column.dtype() {
            DataType::Date => column_dates(&df, dataset, name)?,
            DataType::Datetime(_, _) => {
                let as_date = DataFrame::new(vec![column.cast(&DataType::Date)?])?;
                column_dates(&as_date, dataset, name)?
            }
            DataType::String => column
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_date_text))
                .collect(),
            dtype if dtype.is_primitive_numeric() => column_f64(&df, dataset, name)?
                .into_iter()
                .map(|v| v.and_then(excel_serial_to_date))
                .collect(),
            other => {
                return Err(DashboardError::field(
                    dataset,
                    name,
                    format!("cannot be read as dates (type {})", other),
                ))
            }
        };

        let present: Vec<bool> = match column.dtype() {
            DataType::String => column
                .str()?
                .into_iter()
                .map(|v| v.is_some_and(|s| !s.trim().is_empty()))
                .collect(),
            _ => column.is_not_null().into_iter().map(|v| v.unwrap_or(false)).collect(),
        };
        let invalid: Vec<usize> = parsed
            .iter()
            .zip(&present)
            .enumerate()
            .filter_map(|(i, (d, present))| (*present && d.is_none()).then_some(i))
            .collect();

        let mut df = df;
        df.with_column(date_column(name, &parsed)?)?;
        if invalid.is_empty() {
            return Ok(df);
        }

        match field.policy_or(DEFAULT_DATE_POLICY) {
            InvalidPolicy::Fail => Err(DashboardError::field(
                dataset,
                name,
                format!(
                    "has {} value(s) that are not dates (first at row {})",
                    invalid.len(),
                    invalid[0] + 1
                ),
            )),
            InvalidPolicy::Null => {
                *report.nulled_values.entry(name.to_string()).or_default() += invalid.len();
                Ok(df)
            }
            InvalidPolicy::DropRow => {
                let mut keep = vec![true; df.height()];
                for i in &invalid {
                    keep[*i] = false;
                }
                *report.dropped_rows.entry(name.to_string()).or_default() += invalid.len();
                retain_rows(&df, &keep)
            }
        }
    }

    /// Convert a column to numbers. Absent values stay absent; only present
    /// values that fail to parse are subject to the policy.
    pub fn coerce_numbers(
        dataset: &str,
        df: DataFrame,
        field: &FieldSpec,
        report: &mut CleanReport,
    ) -> Result<DataFrame> {
        let name = field.column.as_str();
        let column = require_column(&df, dataset, name)?;

        let (values, invalid): (Vec<Option<f64>>, Vec<usize>) = match column.dtype() {
            DataType::String => {
                let mut values = Vec::with_capacity(column.len());
                let mut invalid = Vec::new();
                for (i, raw) in column.str()?.into_iter().enumerate() {
                    let parsed = parse_f64_lenient(raw);
                    let blank = raw.map_or(true, |s| s.trim().is_empty());
                    if parsed.is_none() && !blank {
                        invalid.push(i);
                    }
                    values.push(parsed);
                }
                (values, invalid)
            }
            DataType::Boolean => (column_f64(&df, dataset, name)?, Vec::new()),
            dtype if dtype.is_primitive_numeric() => (column_f64(&df, dataset, name)?, Vec::new()),
            other => {
                return Err(DashboardError::field(
                    dataset,
                    name,
                    format!("cannot be read as numbers (type {})", other),
                ))
            }
        };

        let mut df = df;
        df.with_column(Column::new(name.into(), values))?;
        if invalid.is_empty() {
            return Ok(df);
        }

        match field.policy_or(DEFAULT_NUMBER_POLICY) {
            InvalidPolicy::Fail => Err(DashboardError::field(
                dataset,
                name,
                format!(
                    "has {} non-numeric value(s) (first at row {})",
                    invalid.len(),
                    invalid[0] + 1
                ),
            )),
            InvalidPolicy::Null => {
                *report.nulled_values.entry(name.to_string()).or_default() += invalid.len();
                Ok(df)
            }
            InvalidPolicy::DropRow => {
                let mut keep = vec![true; df.height()];
                for i in &invalid {
                    keep[*i] = false;
                }
                *report.dropped_rows.entry(name.to_string()).or_default() += invalid.len();
                retain_rows(&df, &keep)
            }
        }
    }

    /// Append (or replace) a derived column.
    pub fn derive(dataset: &str, mut df: DataFrame, spec: &DeriveSpec) -> Result<DataFrame> {
        let output = spec.output();
        let column = match spec {
            DeriveSpec::MonthYearLabel { month, year, .. } => {
                let labels: Vec<Option<String>> = month_year_pairs(&df, dataset, month, year)?
                    .into_iter()
                    .map(|pair| {
                        pair.map(|(y, m)| format!("{}-{:02}", month_abbrev(m), y.rem_euclid(100)))
                    })
                    .collect();
                Column::new(output.into(), labels)
            }
            DeriveSpec::MonthStart { month, year, .. } => {
                let dates: Vec<Option<NaiveDate>> = month_year_pairs(&df, dataset, month, year)?
                    .into_iter()
                    .map(|pair| pair.and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1)))
                    .collect();
                date_column(output, &dates)?
            }
            DeriveSpec::TruncateToMonth { date, .. } => {
                let dates: Vec<Option<NaiveDate>> = column_dates(&df, dataset, date)?
                    .into_iter()
                    .map(|d| d.map(first_of_month))
                    .collect();
                date_column(output, &dates)?
            }
            DeriveSpec::RowStdDev { columns, .. } => {
                let sources = columns
                    .iter()
                    .map(|c| column_f64(&df, dataset, c))
                    .collect::<Result<Vec<_>>>()?;
                let deviations: Vec<Option<f64>> = (0..df.height())
                    .map(|row| {
                        let values: Vec<f64> = sources.iter().filter_map(|s| s[row]).collect();
                        (values.len() >= 2).then(|| values.iter().std_dev())
                    })
                    .collect();
                Column::new(output.into(), deviations)
            }
        };
        df.with_column(column)?;
        Ok(df)
    }
}

/// (year, month) per row from a month column (name or number) and a year column.
fn month_year_pairs(
    df: &DataFrame,
    dataset: &str,
    month: &str,
    year: &str,
) -> Result<Vec<Option<(i32, u32)>>> {
    let months = column_keys(df, dataset, month)?;
    let years = column_keys(df, dataset, year)?;
    Ok(months
        .into_iter()
        .zip(years)
        .map(|(m, y)| {
            let month = match m? {
                GroupKey::Int(n) if (1..=12).contains(&n) => n as u32,
                GroupKey::Text(s) => parse_month(&s)?,
                GroupKey::Date(d) => chrono::Datelike::month(&d),
                _ => return None,
            };
            let year = match y? {
                GroupKey::Int(n) => i32::try_from(n).ok()?,
                GroupKey::Text(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            Some((year, month))
        })
        .collect())
}

/// Remove the text from the first `(` to the last `)` and trim.
pub fn strip_parenthetical(s: &str) -> String {
    match (s.find('('), s.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            format!("{}{}", &s[..open], &s[close + 1..]).trim().to_string()
        }
        _ => s.trim().to_string(),
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Spreadsheet serial day numbers count from 1899-12-30.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceConfig {
        SourceConfig::new("events", "events.xlsx")
    }

    #[test]
    fn drops_only_fully_empty_columns() {
        let df = df!(
            "Events" => [Some(1.0), None],
            "Notes" => [None::<f64>, None],
        )
        .unwrap();
        let dataset = DataCleaner::clean("t", df, &source()).unwrap();
        assert_eq!(dataset.report.dropped_columns, vec!["Notes".to_string()]);
        assert_eq!(dataset.height(), 2);
        assert!(has_column(&dataset.frame, "Events"));
    }

    #[test]
    fn missing_required_column_names_it() {
        let df = df!("Year" => [2023], "Events" => [10.0]).unwrap();
        let mut src = source();
        src.required = vec!["Year".into(), "Events".into(), "Fatalities".into()];
        let err = DataCleaner::clean("Political Violence", df, &src).unwrap_err();
        match err {
            DashboardError::FieldParse { column, dataset, .. } => {
                assert_eq!(column, "Fatalities");
                assert_eq!(dataset, "Political Violence");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparseable_dates_drop_rows_by_default() {
        let df = df!(
            "Date" => ["2023-10-07", "not a date", "15/11/2023"],
            "Killed" => [1.0, 2.0, 3.0],
        )
        .unwrap();
        let mut src = source();
        src.dates = vec![FieldSpec::new("Date")];
        let dataset = DataCleaner::clean("t", df, &src).unwrap();

        assert_eq!(dataset.height(), 2);
        assert_eq!(dataset.report.dropped_rows.get("Date"), Some(&1));
        let dates = column_dates(&dataset.frame, "t", "Date").unwrap();
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(2023, 11, 15));
    }

    #[test]
    fn strict_dates_fail_naming_the_column() {
        let df = df!("date" => ["2023-10-07", "??"]).unwrap();
        let mut src = source();
        src.dates = vec![FieldSpec::with_policy("date", InvalidPolicy::Fail)];
        let err = DataCleaner::clean("t", df, &src).unwrap_err();
        assert!(matches!(err, DashboardError::FieldParse { ref column, .. } if column == "date"));
    }

    #[test]
    fn blank_dates_stay_null_under_every_policy() {
        let df = df!(
            "date" => [Some("2023-10-07"), None, Some("  "), Some("2023-10-09")],
            "killed total" => [1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        let mut strict = source();
        strict.dates = vec![FieldSpec::with_policy("date", InvalidPolicy::Fail)];
        let dataset = DataCleaner::clean("t", df.clone(), &strict).unwrap();
        assert_eq!(dataset.height(), 4);
        assert_eq!(dataset.frame.column("date").unwrap().null_count(), 2);

        let mut lenient = source();
        lenient.dates = vec![FieldSpec::new("date")];
        let dataset = DataCleaner::clean("t", df, &lenient).unwrap();
        assert_eq!(dataset.height(), 4);
        assert!(dataset.report.dropped_rows.is_empty());
    }

    #[test]
    fn unparseable_numbers_become_null_not_zero() {
        let df = df!("Health Workers Killed" => ["2", "unknown", ""]).unwrap();
        let mut src = source();
        src.numbers = vec![FieldSpec::new("Health Workers Killed")];
        let dataset = DataCleaner::clean("t", df, &src).unwrap();

        assert_eq!(dataset.height(), 3);
        assert_eq!(
            column_f64(&dataset.frame, "t", "Health Workers Killed").unwrap(),
            vec![Some(2.0), None, None]
        );
        assert_eq!(dataset.report.nulled_values.get("Health Workers Killed"), Some(&1));
    }

    #[test]
    fn derives_month_year_label_and_start() {
        let df = df!("Month" => ["October", "January"], "Year" => [2023.0, 2024.0]).unwrap();
        let mut src = source();
        src.derive = vec![
            DeriveSpec::MonthYearLabel {
                month: "Month".into(),
                year: "Year".into(),
                output: "month_of_year".into(),
            },
            DeriveSpec::MonthStart {
                month: "Month".into(),
                year: "Year".into(),
                output: "period".into(),
            },
        ];
        let dataset = DataCleaner::clean("t", df, &src).unwrap();
        let labels = column_keys(&dataset.frame, "t", "month_of_year").unwrap();
        assert_eq!(labels[0], Some(GroupKey::text("Oct-23")));
        assert_eq!(labels[1], Some(GroupKey::text("Jan-24")));
        let periods = column_dates(&dataset.frame, "t", "period").unwrap();
        assert_eq!(periods[0], NaiveDate::from_ymd_opt(2023, 10, 1));
    }

    #[test]
    fn derive_without_source_column_fails() {
        let df = df!("Year" => [2023]).unwrap();
        let spec = DeriveSpec::MonthYearLabel {
            month: "Month".into(),
            year: "Year".into(),
            output: "m".into(),
        };
        let err = DataCleaner::derive("t", df, &spec).unwrap_err();
        assert!(matches!(err, DashboardError::FieldParse { ref column, .. } if column == "Month"));
    }

    #[test]
    fn row_std_dev_needs_two_values() {
        let df = df!(
            "Nov-23" => [Some(1.0), Some(5.0)],
            "Dec-23" => [Some(3.0), None],
        )
        .unwrap();
        let spec = DeriveSpec::RowStdDev {
            columns: vec!["Nov-23".into(), "Dec-23".into()],
            output: "Price Volatility".into(),
        };
        let df = DataCleaner::derive("t", df, &spec).unwrap();
        let vol = column_f64(&df, "t", "Price Volatility").unwrap();
        assert!((vol[0].unwrap() - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert_eq!(vol[1], None);
    }

    #[test]
    fn prepare_strips_and_renames() {
        let df = df!(
            "Unnamed: 0" => [1, 2],
            "commodity name (english)" => ["Sugar (1kg)", "Flour (25 kg) white"],
            "price" => [5.0, 50.0],
        )
        .unwrap();
        let steps = vec![
            PrepareStep::DropColumns {
                columns: vec!["Unnamed: 0".into(), "not there".into()],
            },
            PrepareStep::StripParenthetical {
                column: "commodity name (english)".into(),
            },
            PrepareStep::SetColumnNames {
                names: vec!["Commodity Name".into(), "Price".into()],
            },
        ];
        let df = DataCleaner::prepare("t", df, &steps).unwrap();
        assert_eq!(
            column_keys(&df, "t", "Commodity Name").unwrap(),
            vec![Some(GroupKey::text("Sugar")), Some(GroupKey::text("Flour  white"))]
        );

        let bad = vec![PrepareStep::SetColumnNames {
            names: vec!["only one".into()],
        }];
        assert!(DataCleaner::prepare("t", df, &bad).is_err());
    }

    #[test]
    fn cleaning_is_idempotent() {
        let df = df!(
            "Date" => ["2023-10-07", "bad", "2023-10-09"],
            "Killed" => ["1", "x", "3"],
            "Empty" => [None::<f64>, None, None],
        )
        .unwrap();
        let mut src = source();
        src.dates = vec![FieldSpec::new("Date")];
        src.numbers = vec![FieldSpec::new("Killed")];
        src.derive = vec![DeriveSpec::TruncateToMonth {
            date: "Date".into(),
            output: "Month".into(),
        }];

        let once = DataCleaner::clean("t", df, &src).unwrap();
        let twice = DataCleaner::clean("t", once.frame.clone(), &src).unwrap();
        assert!(once.frame.equals_missing(&twice.frame));
        assert_eq!(twice.report.rows_in, twice.report.rows_out);
    }

    #[test]
    fn excel_serials_and_text_formats() {
        assert_eq!(excel_serial_to_date(45206.0), NaiveDate::from_ymd_opt(2023, 10, 7));
        assert_eq!(excel_serial_to_date(-3.0), None);
        assert_eq!(
            parse_date_text("October 7, 2023"),
            NaiveDate::from_ymd_opt(2023, 10, 7)
        );
        assert_eq!(
            parse_date_text("2023-10-07T12:30:00"),
            NaiveDate::from_ymd_opt(2023, 10, 7)
        );
    }
}
