//! Chart Spec Module
//! Binds an aggregate result to a chart kind. Reshaping only, no computation.

use crate::config::ChartKind;
use crate::data::GroupKey;
use crate::error::{DashboardError, Result};
use crate::stats::{AggregateResult, BoxSummary, HistogramBin};

/// Axis titles and key formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartLabels {
    pub x: Option<String>,
    pub y: Option<String>,
    /// strftime pattern applied to date keys.
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Chart data in the shape each chart family draws.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Categories on x, one value per category per series.
    Categorical {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// `cells[r][c]`. Diverging matrices are drawn on a -1..1 scale.
    Matrix {
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<f64>>,
        diverging: bool,
    },
    /// Points on a categorical x/y grid sized by value.
    Bubbles {
        x: Vec<String>,
        y: Vec<String>,
        points: Vec<(usize, usize, f64)>,
    },
    Boxes(Vec<BoxSummary>),
    Bins(Vec<HistogramBin>),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Categorical { categories, .. } => categories.is_empty(),
            ChartData::Matrix { rows, columns, .. } => rows.is_empty() || columns.is_empty(),
            ChartData::Bubbles { points, .. } => points.is_empty(),
            ChartData::Boxes(boxes) => boxes.iter().all(|b| b.count == 0),
            ChartData::Bins(bins) => bins.is_empty(),
        }
    }
}

/// A rendering instruction: data, kind, labels and caption.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub data: ChartData,
    pub labels: ChartLabels,
    pub caption: String,
}

impl ChartSpec {
    /// Reshape `result` for `kind`, rejecting combinations the kind cannot draw.
    pub fn bind(
        dataset: &str,
        title: &str,
        kind: ChartKind,
        result: &AggregateResult,
        labels: ChartLabels,
    ) -> Result<Self> {
        let fmt = labels.date_format.as_deref();
        let label_all = |keys: &[GroupKey]| -> Vec<String> {
            keys.iter().map(|k| k.label(fmt)).collect()
        };

        let data = match (kind, result) {
            (
                ChartKind::Line | ChartKind::Bar | ChartKind::StackedBar | ChartKind::Pie,
                AggregateResult::Grouped(g),
            ) if g.keys.len() == 1 && (kind != ChartKind::Pie || g.metrics.len() == 1) => {
                ChartData::Categorical {
                    categories: g.rows.iter().map(|r| r.keys[0].label(fmt)).collect(),
                    series: g
                        .metrics
                        .iter()
                        .enumerate()
                        .map(|(i, name)| Series {
                            name: name.clone(),
                            values: g.rows.iter().map(|r| r.values[i]).collect(),
                        })
                        .collect(),
                }
            }
            (ChartKind::Line | ChartKind::Bar | ChartKind::StackedBar, AggregateResult::Pivot(p)) => {
                ChartData::Categorical {
                    categories: label_all(&p.rows),
                    series: p
                        .columns
                        .iter()
                        .enumerate()
                        .map(|(c, key)| Series {
                            name: key.label(fmt),
                            values: p.cells.iter().map(|row| row[c]).collect(),
                        })
                        .collect(),
                }
            }
            (ChartKind::Pie, AggregateResult::Totals(t)) => ChartData::Categorical {
                categories: t.entries.iter().map(|(c, _)| c.clone()).collect(),
                series: vec![Series {
                    name: title.to_string(),
                    values: t.entries.iter().map(|(_, v)| *v).collect(),
                }],
            },
            (ChartKind::Bar, AggregateResult::Totals(t)) => ChartData::Categorical {
                categories: t.entries.iter().map(|(c, _)| c.clone()).collect(),
                series: vec![Series {
                    name: title.to_string(),
                    values: t.entries.iter().map(|(_, v)| *v).collect(),
                }],
            },
            (ChartKind::Heatmap, AggregateResult::Pivot(p)) => ChartData::Matrix {
                rows: label_all(&p.rows),
                columns: label_all(&p.columns),
                cells: p.cells.clone(),
                diverging: false,
            },
            (ChartKind::Heatmap, AggregateResult::Correlation(c)) => ChartData::Matrix {
                rows: c.columns.clone(),
                columns: c.columns.clone(),
                cells: c.matrix.clone(),
                diverging: true,
            },
            (ChartKind::Bubble, AggregateResult::Grouped(g))
                if g.keys.len() == 2 && !g.metrics.is_empty() =>
            {
                let mut xs: Vec<GroupKey> = g.rows.iter().map(|r| r.keys[0].clone()).collect();
                let mut ys: Vec<GroupKey> = g.rows.iter().map(|r| r.keys[1].clone()).collect();
                xs.sort();
                xs.dedup();
                ys.sort();
                ys.dedup();
                let points = g
                    .rows
                    .iter()
                    .filter_map(|r| {
                        let x = xs.binary_search(&r.keys[0]).ok()?;
                        let y = ys.binary_search(&r.keys[1]).ok()?;
                        Some((x, y, r.values[0]))
                    })
                    .collect();
                ChartData::Bubbles {
                    x: label_all(&xs),
                    y: label_all(&ys),
                    points,
                }
            }
            (ChartKind::BoxPlot, AggregateResult::Distribution(boxes)) => {
                ChartData::Boxes(boxes.clone())
            }
            (ChartKind::Histogram, AggregateResult::Histogram(h)) => ChartData::Bins(h.bins.clone()),
            _ => {
                return Err(DashboardError::Render {
                    dataset: dataset.to_string(),
                    chart: title.to_string(),
                    reason: format!(
                        "a {:?} chart cannot show a {} result",
                        kind,
                        result.kind_name()
                    ),
                })
            }
        };

        Ok(Self {
            title: title.to_string(),
            kind,
            data,
            labels,
            caption: String::new(),
        })
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// True when nothing would be drawn: no categories, cells or points, no
    /// finite values, or a pie without a positive slice.
    pub fn is_blank(&self) -> bool {
        if self.data.is_empty() {
            return true;
        }
        match &self.data {
            ChartData::Categorical { series, .. } => {
                let pie = self.kind == ChartKind::Pie;
                !series
                    .iter()
                    .flat_map(|s| s.values.iter())
                    .any(|v| v.is_finite() && (!pie || *v > 0.0))
            }
            ChartData::Bubbles { points, .. } => !points.iter().any(|(_, _, v)| v.is_finite()),
            _ => false,
        }
    }
}
