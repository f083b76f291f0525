//! Aggregator Module
//! Grouped metrics, pivots, correlations, totals and distributions over a
//! filtered view. Every function is pure and orders groups by key.

use crate::config::{AggregateSpec, MetricKind, MetricSpec};
use crate::data::value::{column_f64, column_keys, present_f64, GroupKey};
use crate::error::{DashboardError, Result};
use crate::stats::result::*;
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Tukey fence multiplier for box-plot whiskers.
pub const WHISKER_IQR: f64 = 1.5;

/// Handles aggregate calculations over filtered views.
pub struct Aggregator;

impl Aggregator {
    /// Evaluate a configured aggregation.
    pub fn run(dataset: &str, view: &DataFrame, spec: &AggregateSpec) -> Result<AggregateResult> {
        let result = match spec {
            AggregateSpec::Grouped {
                keys,
                metrics,
                sort_desc_by,
                limit,
            } => AggregateResult::Grouped(Self::grouped(
                dataset,
                view,
                keys,
                metrics,
                sort_desc_by.as_deref(),
                *limit,
            )?),
            AggregateSpec::Pivot {
                row,
                column,
                value,
                op,
            } => AggregateResult::Pivot(Self::pivot(
                dataset,
                view,
                row,
                column,
                value.as_deref(),
                *op,
            )?),
            AggregateSpec::Correlation { columns } => {
                AggregateResult::Correlation(Self::correlation(dataset, view, columns)?)
            }
            AggregateSpec::Totals { columns, op } => {
                AggregateResult::Totals(Self::totals(dataset, view, columns, *op)?)
            }
            AggregateSpec::Distribution { columns } => {
                AggregateResult::Distribution(Self::distribution(dataset, view, columns)?)
            }
            AggregateSpec::GroupedDistribution { key, value } => AggregateResult::Distribution(
                Self::grouped_distribution(dataset, view, key, value)?,
            ),
            AggregateSpec::Histogram { column, bins } => {
                AggregateResult::Histogram(Self::histogram(dataset, view, column, *bins)?)
            }
        };
        Ok(result)
    }

    /// Group rows by `keys` and evaluate each metric per group.
    ///
    /// Rows with an absent key are not grouped. With `sort_desc_by` the groups
    /// are ranked by that metric, largest first, ties broken by key.
    pub fn grouped(
        dataset: &str,
        view: &DataFrame,
        keys: &[String],
        metrics: &[MetricSpec],
        sort_desc_by: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Grouped> {
        let key_columns = keys
            .iter()
            .map(|k| column_keys(view, dataset, k))
            .collect::<Result<Vec<_>>>()?;
        let metric_columns = metrics
            .iter()
            .map(|m| match &m.column {
                Some(c) => column_f64(view, dataset, c).map(Some),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        // group -> (row count, parsed values per metric)
        let mut groups: BTreeMap<Vec<GroupKey>, (usize, Vec<Vec<f64>>)> = BTreeMap::new();
        for row in 0..view.height() {
            let Some(key) = key_columns
                .iter()
                .map(|col| col[row].clone())
                .collect::<Option<Vec<GroupKey>>>()
            else {
                continue;
            };
            let entry = groups
                .entry(key)
                .or_insert_with(|| (0, vec![Vec::new(); metrics.len()]));
            entry.0 += 1;
            for (values, column) in entry.1.iter_mut().zip(&metric_columns) {
                if let Some(Some(v)) = column.as_ref().map(|c| c[row]) {
                    values.push(v);
                }
            }
        }

        let mut rows: Vec<GroupRow> = groups
            .into_iter()
            .map(|(keys, (count, values))| GroupRow {
                keys,
                values: metrics
                    .iter()
                    .zip(&values)
                    .map(|(m, v)| Self::metric(m.op, v, m.column.is_none().then_some(count)))
                    .collect(),
            })
            .collect();

        if let Some(metric) = sort_desc_by {
            let idx = metrics
                .iter()
                .position(|m| m.name == metric)
                .ok_or_else(|| DashboardError::field(dataset, metric, "is not a metric of this aggregation"))?;
            rows.sort_by(|a, b| descending_nan_last(a.values[idx], b.values[idx]));
        }
        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        Ok(Grouped {
            keys: keys.to_vec(),
            metrics: metrics.iter().map(|m| m.name.clone()).collect(),
            rows,
        })
    }

    /// Two-key matrix of one metric. Cells without data are `0.0`.
    pub fn pivot(
        dataset: &str,
        view: &DataFrame,
        row: &str,
        column: &str,
        value: Option<&str>,
        op: MetricKind,
    ) -> Result<Pivot> {
        let metric = MetricSpec {
            name: value.unwrap_or("rows").to_string(),
            column: value.map(str::to_string),
            op,
        };
        let grouped = Self::grouped(
            dataset,
            view,
            &[row.to_string(), column.to_string()],
            std::slice::from_ref(&metric),
            None,
            None,
        )?;

        let rows: Vec<GroupKey> = grouped
            .rows
            .iter()
            .map(|r| r.keys[0].clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let columns: Vec<GroupKey> = grouped
            .rows
            .iter()
            .map(|r| r.keys[1].clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells = vec![vec![0.0; columns.len()]; rows.len()];
        for group in &grouped.rows {
            let (Ok(r), Ok(c)) = (
                rows.binary_search(&group.keys[0]),
                columns.binary_search(&group.keys[1]),
            ) else {
                continue;
            };
            let v = group.values[0];
            cells[r][c] = if v.is_nan() { 0.0 } else { v };
        }

        Ok(Pivot {
            row_name: row.to_string(),
            column_name: column.to_string(),
            rows,
            columns,
            cells,
        })
    }

    /// Pearson correlation matrix over pairwise-complete observations.
    pub fn correlation(dataset: &str, view: &DataFrame, columns: &[String]) -> Result<Correlation> {
        let values = columns
            .iter()
            .map(|c| column_f64(view, dataset, c))
            .collect::<Result<Vec<_>>>()?;

        let n = columns.len();
        let mut matrix = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                let (xs, ys): (Vec<f64>, Vec<f64>) = values[i]
                    .iter()
                    .zip(&values[j])
                    .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                    .unzip();
                let r = Self::pearson(&xs, &ys);
                let r = if i == j && !r.is_nan() { 1.0 } else { r };
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }

        Ok(Correlation {
            columns: columns.to_vec(),
            matrix,
        })
    }

    /// One value per column, in the given order.
    pub fn totals(
        dataset: &str,
        view: &DataFrame,
        columns: &[String],
        op: MetricKind,
    ) -> Result<Totals> {
        let entries = columns
            .iter()
            .map(|c| {
                let values = present_f64(view, dataset, c)?;
                Ok((c.clone(), Self::metric(op, &values, None)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Totals { op, entries })
    }

    /// One box per column.
    pub fn distribution(
        dataset: &str,
        view: &DataFrame,
        columns: &[String],
    ) -> Result<Vec<BoxSummary>> {
        columns
            .iter()
            .map(|c| Ok(Self::box_summary(c, &present_f64(view, dataset, c)?)))
            .collect()
    }

    /// One box per value of `key`, in key order.
    pub fn grouped_distribution(
        dataset: &str,
        view: &DataFrame,
        key: &str,
        value: &str,
    ) -> Result<Vec<BoxSummary>> {
        let keys = column_keys(view, dataset, key)?;
        let values = column_f64(view, dataset, value)?;

        let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
        for (k, v) in keys.into_iter().zip(values) {
            if let Some(k) = k {
                let entry = groups.entry(k).or_default();
                if let Some(v) = v {
                    entry.push(v);
                }
            }
        }
        Ok(groups
            .into_iter()
            .map(|(k, v)| Self::box_summary(&k.to_string(), &v))
            .collect())
    }

    /// Equal-width bins between the smallest and largest value.
    pub fn histogram(dataset: &str, view: &DataFrame, column: &str, bins: usize) -> Result<Histogram> {
        let values = present_f64(view, dataset, column)?;
        let bins = bins.max(1);
        if values.is_empty() {
            return Ok(Histogram {
                column: column.to_string(),
                bins: Vec::new(),
            });
        }

        let (min, max) = min_max(&values);
        let (start, width) = if max > min {
            (min, (max - min) / bins as f64)
        } else {
            (min - 0.5, 1.0 / bins as f64)
        };

        let mut counts = vec![0usize; bins];
        for v in &values {
            let idx = (((v - start) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Histogram {
            column: column.to_string(),
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| HistogramBin {
                    start: start + width * i as f64,
                    end: start + width * (i + 1) as f64,
                    count,
                })
                .collect(),
        })
    }

    /// Summary statistics table, one row per column.
    pub fn describe(dataset: &str, view: &DataFrame, columns: &[String]) -> Result<Vec<ColumnSummary>> {
        columns
            .iter()
            .map(|c| {
                let mut summary = Self::column_summary(&present_f64(view, dataset, c)?);
                summary.column = c.clone();
                Ok(summary)
            })
            .collect()
    }

    /// A single scalar for a metric card.
    pub fn headline(
        dataset: &str,
        view: &DataFrame,
        column: Option<&str>,
        op: MetricKind,
    ) -> Result<f64> {
        match column {
            Some(c) => Ok(Self::metric(op, &present_f64(view, dataset, c)?, None)),
            None => Ok(Self::metric(op, &[], Some(view.height()))),
        }
    }

    /// Evaluate one metric. `rows` is the row count used by `count` when the
    /// metric has no column.
    pub fn metric(op: MetricKind, values: &[f64], rows: Option<usize>) -> f64 {
        match op {
            MetricKind::Sum => values.iter().sum(),
            MetricKind::Count => rows.unwrap_or(values.len()) as f64,
            MetricKind::Mean => values.iter().mean(),
            MetricKind::StdDev => values.iter().std_dev(),
            MetricKind::Min | MetricKind::Max if values.is_empty() => f64::NAN,
            MetricKind::Min => min_max(values).0,
            MetricKind::Max => min_max(values).1,
        }
    }

    /// Compute descriptive statistics for an array of values.
    pub fn column_summary(values: &[f64]) -> ColumnSummary {
        let n = values.len();
        if n == 0 {
            return ColumnSummary::default();
        }

        let sorted = sorted(values);
        ColumnSummary {
            column: String::new(),
            count: n,
            mean: values.iter().mean(),
            std: if n > 1 { values.iter().std_dev() } else { 0.0 },
            min: sorted[0],
            p25: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Quartiles, Tukey whiskers and outliers of a sample.
    pub fn box_summary(label: &str, values: &[f64]) -> BoxSummary {
        if values.is_empty() {
            return BoxSummary {
                label: label.to_string(),
                count: 0,
                mean: f64::NAN,
                q1: f64::NAN,
                median: f64::NAN,
                q3: f64::NAN,
                lower_whisker: f64::NAN,
                upper_whisker: f64::NAN,
                outliers: Vec::new(),
            };
        }

        let sorted = sorted(values);
        let q1 = Self::percentile(&sorted, 25.0);
        let q3 = Self::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| (low_fence..=high_fence).contains(v))
            .collect();
        let outliers: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| !(low_fence..=high_fence).contains(v))
            .collect();

        BoxSummary {
            label: label.to_string(),
            count: sorted.len(),
            mean: values.iter().mean(),
            q1,
            median: Self::percentile(&sorted, 50.0),
            q3,
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
        if xs.len() < 2 {
            return f64::NAN;
        }
        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return f64::NAN;
        }
        xs.iter().covariance(ys.iter()) / (sx * sy)
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> DataFrame {
        df!(
            "Year" => [2023.0, 2024.0],
            "Events" => [10.0, 30.0],
            "Fatalities" => [5.0, 20.0],
        )
        .unwrap()
    }

    fn sums() -> Vec<MetricSpec> {
        vec![
            MetricSpec::new("total_events", Some("Events"), MetricKind::Sum),
            MetricSpec::new("total_fatalities", Some("Fatalities"), MetricKind::Sum),
        ]
    }

    #[test]
    fn grouped_sums_by_year() {
        let grouped =
            Aggregator::grouped("t", &events(), &["Year".into()], &sums(), None, None).unwrap();
        let y23 = GroupKey::Int(2023);
        let y24 = GroupKey::Int(2024);
        assert_eq!(grouped.get(&y23, "total_events"), Some(10.0));
        assert_eq!(grouped.get(&y24, "total_events"), Some(30.0));
        assert_eq!(grouped.get(&y23, "total_fatalities"), Some(5.0));
        assert_eq!(grouped.get(&y24, "total_fatalities"), Some(20.0));
    }

    #[test]
    fn groups_are_sorted_and_null_keys_skipped() {
        let df = df!(
            "Region" => [Some("West Bank"), None, Some("Gaza Strip"), Some("West Bank")],
            "Events" => [1.0, 100.0, 2.0, 3.0],
        )
        .unwrap();
        let metrics = vec![
            MetricSpec::new("events", Some("Events"), MetricKind::Sum),
            MetricSpec::new("rows", None, MetricKind::Count),
        ];
        let grouped =
            Aggregator::grouped("t", &df, &["Region".into()], &metrics, None, None).unwrap();
        let keys: Vec<String> = grouped.rows.iter().map(|r| r.keys[0].to_string()).collect();
        assert_eq!(keys, vec!["Gaza Strip", "West Bank"]);
        assert_eq!(grouped.metric_values("events"), Some(vec![2.0, 4.0]));
        assert_eq!(grouped.metric_values("rows"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn unparsed_values_are_excluded_not_zero() {
        let df = df!(
            "Region" => ["A", "A", "A"],
            "Killed" => [Some(4.0), None, Some(2.0)],
        )
        .unwrap();
        let metrics = vec![
            MetricSpec::new("mean", Some("Killed"), MetricKind::Mean),
            MetricSpec::new("count", Some("Killed"), MetricKind::Count),
        ];
        let grouped =
            Aggregator::grouped("t", &df, &["Region".into()], &metrics, None, None).unwrap();
        assert_eq!(grouped.rows[0].values, vec![3.0, 2.0]);
    }

    #[test]
    fn ranking_breaks_ties_by_key() {
        let df = df!(
            "Admin 1" => ["c", "a", "b", "d"],
            "n" => [5.0, 5.0, 9.0, 1.0],
        )
        .unwrap();
        let metrics = vec![MetricSpec::new("n", Some("n"), MetricKind::Sum)];
        let grouped =
            Aggregator::grouped("t", &df, &["Admin 1".into()], &metrics, Some("n"), Some(3))
                .unwrap();
        let keys: Vec<String> = grouped.rows.iter().map(|r| r.keys[0].to_string()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);

        let err = Aggregator::grouped("t", &df, &["Admin 1".into()], &metrics, Some("x"), None)
            .unwrap_err();
        assert!(matches!(err, DashboardError::FieldParse { .. }));
    }

    #[test]
    fn pivot_fills_absent_pairs_with_zero() {
        let df = df!(
            "Admin2" => ["Gaza", "Gaza", "Hebron"],
            "Year" => [2023.0, 2024.0, 2024.0],
            "Fatalities" => [5.0, 7.0, 1.0],
        )
        .unwrap();
        let pivot = Aggregator::pivot(
            "t",
            &df,
            "Admin2",
            "Year",
            Some("Fatalities"),
            MetricKind::Sum,
        )
        .unwrap();
        assert_eq!(pivot.rows.len(), 2);
        assert_eq!(pivot.columns, vec![GroupKey::Int(2023), GroupKey::Int(2024)]);
        assert_eq!(
            pivot.cell(&GroupKey::text("Hebron"), &GroupKey::Int(2023)),
            Some(0.0)
        );
        assert_eq!(pivot.cells, vec![vec![5.0, 7.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn correlation_uses_complete_pairs() {
        let df = df!(
            "Events" => [Some(1.0), Some(2.0), Some(3.0), None],
            "Fatalities" => [Some(2.0), Some(4.0), Some(6.0), Some(100.0)],
            "Flat" => [Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
        )
        .unwrap();
        let corr = Aggregator::correlation(
            "t",
            &df,
            &["Events".into(), "Fatalities".into(), "Flat".into()],
        )
        .unwrap();
        assert!((corr.matrix[0][1] - 1.0).abs() < 1e-12);
        assert_eq!(corr.matrix[1][0], corr.matrix[0][1]);
        assert_eq!(corr.matrix[0][0], 1.0);
        assert!(corr.matrix[0][2].is_nan());
    }

    #[test]
    fn totals_keep_column_order() {
        let totals = Aggregator::totals(
            "t",
            &events(),
            &["Fatalities".into(), "Events".into()],
            MetricKind::Sum,
        )
        .unwrap();
        assert_eq!(
            totals.entries,
            vec![("Fatalities".to_string(), 25.0), ("Events".to_string(), 40.0)]
        );
    }

    #[test]
    fn box_summary_flags_outliers() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let summary = Aggregator::box_summary("x", &values);
        assert_eq!(summary.count, 6);
        assert_eq!(summary.median, 3.5);
        assert_eq!(summary.q1, 2.25);
        assert_eq!(summary.q3, 4.75);
        assert_eq!(summary.outliers, vec![100.0]);
        assert_eq!(summary.upper_whisker, 5.0);
        assert_eq!(summary.lower_whisker, 1.0);
    }

    #[test]
    fn grouped_distribution_boxes_per_key() {
        let df = df!(
            "Commodity" => ["Sugar", "Flour", "Sugar"],
            "Price" => [1.0, 10.0, 3.0],
        )
        .unwrap();
        let boxes = Aggregator::grouped_distribution("t", &df, "Commodity", "Price").unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].label, "Flour");
        assert_eq!(boxes[1].median, 2.0);
    }

    #[test]
    fn histogram_bins_cover_the_range() {
        let df = df!("v" => [0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let hist = Aggregator::histogram("t", &df, "v", 4).unwrap();
        assert_eq!(hist.bins.len(), 4);
        assert_eq!(hist.bins[0].start, 0.0);
        assert_eq!(hist.bins[3].end, 4.0);
        let counts: Vec<usize> = hist.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);

        let flat = df!("v" => [7.0, 7.0]).unwrap();
        let hist = Aggregator::histogram("t", &flat, "v", 3).unwrap();
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn describe_and_headline() {
        let df = df!("Killed" => [Some(1.0), Some(2.0), Some(3.0), None]).unwrap();
        let summary = Aggregator::describe("t", &df, &["Killed".into()]).unwrap();
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].median, 2.0);
        assert_eq!(summary[0].p25, 1.5);
        assert_eq!(summary[0].max, 3.0);

        assert_eq!(
            Aggregator::headline("t", &df, Some("Killed"), MetricKind::Sum).unwrap(),
            6.0
        );
        assert_eq!(
            Aggregator::headline("t", &df, None, MetricKind::Count).unwrap(),
            4.0
        );
    }

    #[test]
    fn metrics_over_no_values() {
        assert_eq!(Aggregator::metric(MetricKind::Sum, &[], None), 0.0);
        assert!(Aggregator::metric(MetricKind::Mean, &[], None).is_nan());
        assert!(Aggregator::metric(MetricKind::Max, &[], None).is_nan());
        assert_eq!(Aggregator::metric(MetricKind::Count, &[], Some(3)), 3.0);
    }
}
