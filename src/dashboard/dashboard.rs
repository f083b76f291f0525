//! Dashboard Module
//! One generic pipeline per topical dataset: filtered views, aggregates and
//! the rendered report, all driven by a DashboardConfig.

use crate::charts::{ChartArtifact, ChartLabels, ChartRenderer, ChartSpec};
use crate::config::{ChartConfig, DashboardConfig};
use crate::dashboard::cache::DatasetCache;
use crate::data::value::{column_keys, distinct_keys, has_column};
use crate::data::{Dataset, FilterCriteria, FilterOption, GroupKey};
use crate::error::{DashboardError, Result};
use crate::format::fill_caption;
use crate::stats::{Aggregator, ColumnSummary};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// A metric card.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineValue {
    pub name: String,
    pub label: String,
    pub value: f64,
}

/// Leading rows of a filtered source as display text.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Aggregates for the current filter selection.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub headline: Vec<HeadlineValue>,
    pub summary: Vec<ColumnSummary>,
    pub preview: Option<Preview>,
    /// Bound charts, paired with the source they were computed from.
    pub charts: Vec<(String, ChartSpec)>,
}

impl Metrics {
    pub fn headline_value(&self, name: &str) -> Option<f64> {
        self.headline.iter().find(|h| h.name == name).map(|h| h.value)
    }
}

/// Everything the report area shows.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub intro: Option<String>,
    pub headline: Vec<HeadlineValue>,
    pub summary: Vec<ColumnSummary>,
    pub preview: Option<Preview>,
    /// One artifact per configured chart, blank where the selection has no data.
    pub charts: Vec<ChartArtifact>,
    pub conclusion: Vec<String>,
}

pub struct Dashboard {
    config: DashboardConfig,
    datasets: BTreeMap<String, Arc<Dataset>>,
    criteria: FilterCriteria,
    views: BTreeMap<String, DataFrame>,
    metrics: Option<Metrics>,
}

impl Dashboard {
    /// Load every source through the cache. Views start unfiltered.
    pub fn open(config: &DashboardConfig, cache: &DatasetCache, data_dir: &Path) -> Result<Self> {
        let mut datasets = BTreeMap::new();
        for source in &config.sources {
            datasets.insert(source.id.clone(), cache.get_or_load(data_dir, source)?);
        }
        let views = datasets
            .iter()
            .map(|(id, dataset)| (id.clone(), dataset.frame.clone()))
            .collect();
        tracing::info!(
            "Opened dashboard '{}' with {} source(s)",
            config.label,
            datasets.len()
        );

        Ok(Self {
            config: config.clone(),
            datasets,
            criteria: FilterCriteria::new(),
            views,
            metrics: None,
        })
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn dataset(&self, source: &str) -> Option<&Arc<Dataset>> {
        self.datasets.get(source)
    }

    /// The filtered view of one source.
    pub fn view(&self, source: &str) -> Option<&DataFrame> {
        self.views.get(source)
    }

    /// Whether aggregates for the current selection are memoised.
    pub fn has_metrics(&self) -> bool {
        self.metrics.is_some()
    }

    /// Distinct values of each filter column across the unfiltered sources.
    pub fn filter_options(&self) -> Result<Vec<FilterOption>> {
        self.config
            .filters
            .iter()
            .map(|filter| {
                let mut values = BTreeSet::new();
                let mut found = false;
                for dataset in self.datasets.values() {
                    if has_column(&dataset.frame, &filter.column) {
                        found = true;
                        values.extend(distinct_keys(&dataset.frame, &dataset.name, &filter.column)?);
                    }
                }
                if !found {
                    return Err(DashboardError::missing_column(self.label(), &filter.column));
                }
                Ok(FilterOption {
                    column: filter.column.clone(),
                    label: filter.label.clone(),
                    values: values.into_iter().collect::<Vec<GroupKey>>(),
                })
            })
            .collect()
    }

    /// Replace the filter selection and rebuild the views. Datasets are not
    /// reloaded; memoised aggregates are dropped.
    pub fn apply_filters(&mut self, criteria: FilterCriteria) -> Result<()> {
        self.metrics = None;
        self.criteria = criteria;
        self.views = self
            .datasets
            .iter()
            .map(|(id, dataset)| Ok((id.clone(), self.criteria.apply(&dataset.name, &dataset.frame)?)))
            .collect::<Result<_>>()?;
        tracing::debug!("{}: filters applied {:?}", self.label(), self.criteria);
        self.ensure_rows()
    }

    /// Headline values, summary table and one aggregate per chart, memoised
    /// until the next filter change.
    pub fn compute_metrics(&mut self) -> Result<&Metrics> {
        let metrics = match self.metrics.take() {
            Some(metrics) => metrics,
            None => self.build_metrics()?,
        };
        Ok(self.metrics.insert(metrics))
    }

    /// Render every chart in parallel and assemble the report. A chart left
    /// without data by the selection comes back blank; the others still draw.
    pub fn render(&mut self, renderer: &ChartRenderer) -> Result<Report> {
        let title = self.config.title.clone();
        let intro = self.config.intro.clone();
        let conclusion = self.config.conclusion.clone();
        let metrics = self.compute_metrics()?;

        let charts = metrics
            .charts
            .par_iter()
            .map(|(source, spec)| renderer.render(source, spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Report {
            title,
            intro,
            headline: metrics.headline.clone(),
            summary: metrics.summary.clone(),
            preview: metrics.preview.clone(),
            charts,
            conclusion,
        })
    }

    fn ensure_rows(&self) -> Result<()> {
        match self.views.iter().find(|(_, view)| view.height() == 0) {
            Some((id, _)) => Err(DashboardError::EmptyResult {
                dataset: self.dataset(id).map_or(id.clone(), |d| d.name.clone()),
            }),
            None => Ok(()),
        }
    }

    fn source_view(&self, source: &str) -> Result<&DataFrame> {
        self.views.get(source).ok_or_else(|| {
            DashboardError::Config(format!("{}: unknown source '{}'", self.label(), source))
        })
    }

    fn build_metrics(&self) -> Result<Metrics> {
        self.ensure_rows()?;

        let headline = self
            .config
            .headline
            .iter()
            .map(|h| {
                let view = self.source_view(&h.source)?;
                Ok(HeadlineValue {
                    name: h.name.clone(),
                    label: h.label.clone(),
                    value: Aggregator::headline(&h.source, view, h.column.as_deref(), h.op)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = match &self.config.summary {
            Some(s) => Aggregator::describe(&s.source, self.source_view(&s.source)?, &s.columns)?,
            None => Vec::new(),
        };

        let preview = self.build_preview()?;

        let values: BTreeMap<String, f64> = headline
            .iter()
            .map(|h| (h.name.clone(), h.value))
            .collect();
        let charts = self
            .config
            .charts
            .par_iter()
            .map(|chart| Ok((chart.source.clone(), self.bind_chart(chart, &values)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Metrics {
            headline,
            summary,
            preview,
            charts,
        })
    }

    fn build_preview(&self) -> Result<Option<Preview>> {
        let Some(preview) = &self.config.preview else {
            return Ok(None);
        };
        let view = self.source_view(&preview.source)?.head(Some(preview.rows));
        let dataset = self
            .dataset(&preview.source)
            .map_or(preview.source.as_str(), |d| d.name.as_str());

        let columns: Vec<String> = view
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let cells = columns
            .iter()
            .map(|c| column_keys(&view, dataset, c))
            .collect::<Result<Vec<_>>>()?;
        let rows = (0..view.height())
            .map(|r| {
                cells
                    .iter()
                    .map(|col| col[r].as_ref().map(|k| k.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Some(Preview { columns, rows }))
    }

    fn bind_chart(&self, chart: &ChartConfig, values: &BTreeMap<String, f64>) -> Result<ChartSpec> {
        let view = self.source_view(&chart.source)?;
        let result = Aggregator::run(&chart.source, view, &chart.aggregate)?;
        let labels = ChartLabels {
            x: chart.x_label.clone(),
            y: chart.y_label.clone(),
            date_format: chart.date_format.clone(),
        };
        Ok(
            ChartSpec::bind(&chart.source, &chart.title, chart.kind, &result, labels)?
                .with_caption(fill_caption(&chart.caption, values)),
        )
    }
}
