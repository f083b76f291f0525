//! Dashboard Configuration Module
//! Data-driven description of every topical dashboard: where its data lives,
//! how it is cleaned, which filters it exposes and which charts it draws.

use crate::error::{DashboardError, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a JSON catalog that replaces the built-in one.
pub const CONFIG_ENV: &str = "CONFLICT_DASH_CONFIG";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CONFLICT_DASH_DATA";

const BUILTIN_CATALOG: &str = include_str!("../dashboards.json");

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub chart: ChartSize,
    pub dashboards: Vec<DashboardConfig>,
}

/// Pixel size of rendered chart bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Category label shown in the selector.
    pub label: String,
    pub title: String,
    #[serde(default)]
    pub intro: Option<String>,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub headline: Vec<HeadlineConfig>,
    #[serde(default)]
    pub summary: Option<SummaryConfig>,
    #[serde(default)]
    pub preview: Option<PreviewConfig>,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    #[serde(default)]
    pub conclusion: Vec<String>,
}

impl DashboardConfig {
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}

/// One table: a file, an optional sheet and its cleaning recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub prepare: Vec<PrepareStep>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub dates: Vec<FieldSpec>,
    #[serde(default)]
    pub numbers: Vec<FieldSpec>,
    #[serde(default)]
    pub derive: Vec<DeriveSpec>,
}

impl SourceConfig {
    pub fn new(id: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            path: path.into(),
            sheet: None,
            prepare: Vec::new(),
            required: Vec::new(),
            dates: Vec::new(),
            numbers: Vec::new(),
            derive: Vec::new(),
        }
    }

    /// File path, relative paths taken from `data_dir`.
    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        resolve_path(data_dir, &self.path)
    }

    /// Identity of the dataset in the cache: same file, sheet and recipe share one entry.
    pub fn cache_key(&self, data_dir: &Path) -> String {
        format!(
            "{}|{}|{}",
            self.id,
            self.resolve(data_dir).display(),
            self.sheet.as_deref().unwrap_or("")
        )
    }
}

/// Source-specific reshaping applied before the generic cleaning steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PrepareStep {
    /// Remove columns by name; names not present are ignored.
    DropColumns { columns: Vec<String> },
    /// Remove the text between the first `(` and the last `)` of a text column.
    StripParenthetical { column: String },
    /// Positional rename of every column.
    SetColumnNames { names: Vec<String> },
}

/// What happens to a value that cannot be coerced to the column's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPolicy {
    DropRow,
    Null,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub column: String,
    #[serde(default)]
    pub on_invalid: Option<InvalidPolicy>,
}

impl FieldSpec {
    pub fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            on_invalid: None,
        }
    }

    pub fn with_policy(column: &str, policy: InvalidPolicy) -> Self {
        Self {
            column: column.to_string(),
            on_invalid: Some(policy),
        }
    }

    pub fn policy_or(&self, default: InvalidPolicy) -> InvalidPolicy {
        self.on_invalid.unwrap_or(default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeriveSpec {
    /// `Oct-23` style label from a month name/number and a year.
    MonthYearLabel {
        month: String,
        year: String,
        output: String,
    },
    /// First day of the month from a month name/number and a year.
    MonthStart {
        month: String,
        year: String,
        output: String,
    },
    /// First day of the month of a date column.
    TruncateToMonth { date: String, output: String },
    /// Sample standard deviation across several numeric columns of each row.
    RowStdDev { columns: Vec<String>, output: String },
}

impl DeriveSpec {
    pub fn output(&self) -> &str {
        match self {
            Self::MonthYearLabel { output, .. }
            | Self::MonthStart { output, .. }
            | Self::TruncateToMonth { output, .. }
            | Self::RowStdDev { output, .. } => output,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Sum,
    Mean,
    Count,
    StdDev,
    Min,
    Max,
}

/// A named metric over one column (or over rows, for `count` without a column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
    pub op: MetricKind,
}

impl MetricSpec {
    pub fn new(name: &str, column: Option<&str>, op: MetricKind) -> Self {
        Self {
            name: name.to_string(),
            column: column.map(str::to_string),
            op,
        }
    }
}

/// Scalar shown as a metric card and available to captions as `{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineConfig {
    pub name: String,
    pub label: String,
    pub source: String,
    #[serde(default)]
    pub column: Option<String>,
    pub op: MetricKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub source: String,
    pub columns: Vec<String>,
}

/// Leading rows of one source shown as a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub source: String,
    #[serde(default = "default_preview_rows")]
    pub rows: usize,
}

fn default_preview_rows() -> usize {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    StackedBar,
    Pie,
    Heatmap,
    Bubble,
    BoxPlot,
    Histogram,
}

impl ChartKind {
    /// Whether this chart kind can draw the result of the given aggregation.
    pub fn accepts(&self, spec: &AggregateSpec) -> bool {
        match (self, spec) {
            (Self::Line | Self::Bar | Self::StackedBar, AggregateSpec::Grouped { keys, .. }) => {
                keys.len() == 1
            }
            (Self::Line | Self::Bar | Self::StackedBar, AggregateSpec::Pivot { .. }) => true,
            (Self::Pie | Self::Bar, AggregateSpec::Totals { .. }) => true,
            (Self::Pie, AggregateSpec::Grouped { keys, metrics, .. }) => {
                keys.len() == 1 && metrics.len() == 1
            }
            (Self::Heatmap, AggregateSpec::Pivot { .. } | AggregateSpec::Correlation { .. }) => {
                true
            }
            (Self::Bubble, AggregateSpec::Grouped { keys, metrics, .. }) => {
                keys.len() == 2 && !metrics.is_empty()
            }
            (
                Self::BoxPlot,
                AggregateSpec::Distribution { .. } | AggregateSpec::GroupedDistribution { .. },
            ) => true,
            (Self::Histogram, AggregateSpec::Histogram { .. }) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregateSpec {
    Grouped {
        keys: Vec<String>,
        metrics: Vec<MetricSpec>,
        /// Rank groups by this metric, largest first, instead of by key.
        #[serde(default)]
        sort_desc_by: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Pivot {
        row: String,
        column: String,
        #[serde(default)]
        value: Option<String>,
        op: MetricKind,
    },
    Correlation {
        columns: Vec<String>,
    },
    Totals {
        columns: Vec<String>,
        op: MetricKind,
    },
    /// One box per column.
    Distribution {
        columns: Vec<String>,
    },
    /// One box per key value.
    GroupedDistribution {
        key: String,
        value: String,
    },
    Histogram {
        column: String,
        bins: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub source: String,
    pub kind: ChartKind,
    pub aggregate: AggregateSpec,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
    /// strftime pattern for date keys, e.g. `%b-%y`.
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub caption: String,
}

impl AppConfig {
    /// Catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(text).map_err(|e| DashboardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Resolve the catalog from the environment, falling back to the built-in one.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                tracing::info!("Loading dashboard catalog from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::builtin()?,
        };
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn resolve(&self, source: &SourceConfig) -> PathBuf {
        source.resolve(&self.data_dir)
    }

    pub fn dashboard(&self, label: &str) -> Option<&DashboardConfig> {
        self.dashboards.iter().find(|d| d.label == label)
    }

    /// Check cross references and chart/aggregate compatibility.
    pub fn validate(&self) -> Result<()> {
        if self.dashboards.is_empty() {
            return Err(DashboardError::Config("no dashboards configured".into()));
        }
        if self.chart.width < 200 || self.chart.height < 150 {
            return Err(DashboardError::Config(format!(
                "chart size {}x{} is too small",
                self.chart.width, self.chart.height
            )));
        }

        let mut labels = HashSet::new();
        for dashboard in &self.dashboards {
            if !labels.insert(dashboard.label.as_str()) {
                return Err(DashboardError::Config(format!(
                    "duplicate dashboard label '{}'",
                    dashboard.label
                )));
            }
            validate_dashboard(dashboard)?;
        }
        Ok(())
    }
}

fn resolve_path(data_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

fn validate_dashboard(dashboard: &DashboardConfig) -> Result<()> {
    let err = |msg: String| DashboardError::Config(format!("{}: {}", dashboard.label, msg));

    if dashboard.sources.is_empty() {
        return Err(err("no sources".into()));
    }
    let mut ids = HashSet::new();
    for source in &dashboard.sources {
        if !ids.insert(source.id.as_str()) {
            return Err(err(format!("duplicate source id '{}'", source.id)));
        }
    }

    let known = |id: &str| ids.contains(id);
    for headline in &dashboard.headline {
        if !known(&headline.source) {
            return Err(err(format!(
                "headline '{}' uses unknown source '{}'",
                headline.name, headline.source
            )));
        }
        if headline.column.is_none() && headline.op != MetricKind::Count {
            return Err(err(format!("headline '{}' needs a column", headline.name)));
        }
    }
    if let Some(summary) = &dashboard.summary {
        if !known(&summary.source) {
            return Err(err(format!("summary uses unknown source '{}'", summary.source)));
        }
    }
    if let Some(preview) = &dashboard.preview {
        if !known(&preview.source) {
            return Err(err(format!("preview uses unknown source '{}'", preview.source)));
        }
        if preview.rows == 0 {
            return Err(err("preview needs at least one row".into()));
        }
    }

    for chart in &dashboard.charts {
        if !known(&chart.source) {
            return Err(err(format!(
                "chart '{}' uses unknown source '{}'",
                chart.title, chart.source
            )));
        }
        if !chart.kind.accepts(&chart.aggregate) {
            return Err(err(format!(
                "chart '{}' cannot draw a {:?} aggregation as {:?}",
                chart.title, chart.aggregate, chart.kind
            )));
        }
        if let Some(format) = &chart.date_format {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(err(format!(
                    "chart '{}' has an invalid date format '{}'",
                    chart.title, format
                )));
            }
        }
        validate_aggregate(&chart.aggregate).map_err(|msg| err(format!("chart '{}': {}", chart.title, msg)))?;
    }
    Ok(())
}

fn validate_aggregate(spec: &AggregateSpec) -> std::result::Result<(), String> {
    match spec {
        AggregateSpec::Grouped {
            keys,
            metrics,
            sort_desc_by,
            ..
        } => {
            if keys.is_empty() || metrics.is_empty() {
                return Err("grouping needs at least one key and one metric".into());
            }
            if let Some(metric) = metric_without_column(metrics) {
                return Err(format!("metric '{}' needs a column", metric));
            }
            if let Some(by) = sort_desc_by {
                if !metrics.iter().any(|m| &m.name == by) {
                    return Err(format!("cannot rank by unknown metric '{}'", by));
                }
            }
        }
        AggregateSpec::Pivot { value, op, .. } => {
            if value.is_none() && *op != MetricKind::Count {
                return Err("pivot needs a value column unless it counts rows".into());
            }
        }
        AggregateSpec::Correlation { columns } => {
            if columns.len() < 2 {
                return Err("correlation needs at least two columns".into());
            }
        }
        AggregateSpec::Totals { columns, .. } | AggregateSpec::Distribution { columns } => {
            if columns.is_empty() {
                return Err("no columns given".into());
            }
        }
        AggregateSpec::GroupedDistribution { .. } => {}
        AggregateSpec::Histogram { bins, .. } => {
            if *bins == 0 {
                return Err("histogram needs at least one bin".into());
            }
        }
    }
    Ok(())
}

fn metric_without_column(metrics: &[MetricSpec]) -> Option<&str> {
    metrics
        .iter()
        .find(|m| m.column.is_none() && m.op != MetricKind::Count)
        .map(|m| m.name.as_str())
}
