//! Chart Renderer
//! Draws a bound ChartSpec into an RGB bitmap with plotters.
//!
//! Categorical axes are f64 ranges from -0.5 to n - 0.5 with category i at x = i,
//! so bars, heatmap cells and bubbles share one layout.

use crate::charts::spec::{ChartData, ChartSpec, Series};
use crate::config::{ChartKind, ChartSize};
use crate::error::{DashboardError, Result};
use crate::format::format_value;
use crate::stats::{BoxSummary, HistogramBin};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::{FRAC_PI_2, TAU};

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

const HEAT_LOW: RGBColor = RGBColor(255, 245, 235);
const HEAT_NEG: RGBColor = RGBColor(52, 152, 219);
const HEAT_POS: RGBColor = RGBColor(231, 76, 60);
const MISSING: RGBColor = RGBColor(220, 220, 220);

const TITLE_FONT: (&str, u32) = ("sans-serif", 24);
const AXIS_FONT: (&str, u32) = ("sans-serif", 14);
const CELL_FONT: (&str, u32) = ("sans-serif", 12);

const MAX_AXIS_LABELS: usize = 30;
const MAX_LABEL_CHARS: usize = 22;
const MAX_ANNOTATED_CELLS: usize = 150;
const BUBBLE_MIN_PX: f64 = 4.0;
const BUBBLE_MAX_PX: f64 = 30.0;

/// A rendered chart handed to the presentation layer. `image` is `None` when
/// the current selection leaves nothing to draw for this chart.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub title: String,
    pub caption: String,
    pub image: Option<RgbImage>,
}

impl ChartArtifact {
    pub fn size(&self) -> Option<[usize; 2]> {
        self.image
            .as_ref()
            .map(|image| [image.width() as usize, image.height() as usize])
    }

    pub fn is_blank(&self) -> bool {
        self.image.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl ChartRenderer {
    pub fn new(size: ChartSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }

    /// Draw one chart. A chart with nothing to draw yields a blank artifact;
    /// drawing failures are render errors naming the chart.
    pub fn render(&self, dataset: &str, spec: &ChartSpec) -> Result<ChartArtifact> {
        let render_error = |reason: String| DashboardError::Render {
            dataset: dataset.to_string(),
            chart: spec.title.clone(),
            reason,
        };
        if spec.is_blank() {
            tracing::debug!("{}: '{}' has no data for the selection", dataset, spec.title);
            return Ok(ChartArtifact {
                title: spec.title.clone(),
                caption: spec.caption.clone(),
                image: None,
            });
        }

        let mut buffer = vec![255u8; self.width as usize * self.height as usize * 3];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.width, self.height)).into_drawing_area();
            paint(&root, spec).map_err(|e| render_error(e.to_string()))?;
        }

        let image = RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or_else(|| render_error("bitmap size mismatch".into()))?;
        tracing::debug!("Rendered '{}' ({:?})", spec.title, spec.kind);
        Ok(ChartArtifact {
            title: spec.title.clone(),
            caption: spec.caption.clone(),
            image: Some(image),
        })
    }
}

fn paint(root: &Area, spec: &ChartSpec) -> DrawResult {
    root.fill(&WHITE)?;
    match &spec.data {
        ChartData::Categorical { categories, series } if spec.kind == ChartKind::Pie => {
            let values = series.first().map(|s| s.values.as_slice()).unwrap_or(&[]);
            draw_pie(root, spec, categories, values)?
        }
        ChartData::Categorical { categories, series } => {
            draw_categorical(root, spec, categories, series)?
        }
        ChartData::Matrix {
            rows,
            columns,
            cells,
            diverging,
        } => draw_matrix(root, spec, rows, columns, cells, *diverging)?,
        ChartData::Bubbles { x, y, points } => draw_bubbles(root, spec, x, y, points)?,
        ChartData::Boxes(boxes) => draw_boxes(root, spec, boxes)?,
        ChartData::Bins(bins) => draw_histogram(root, spec, bins)?,
    }
    root.present()?;
    Ok(())
}

/// Line, grouped bar and stacked bar charts.
fn draw_categorical(
    root: &Area,
    spec: &ChartSpec,
    categories: &[String],
    series: &[Series],
) -> DrawResult {
    let n = categories.len();
    let stacked = spec.kind == ChartKind::StackedBar;
    let (lo, hi) = value_range(series, n, stacked);
    let rotate = needs_rotation(categories);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, TITLE_FONT)
        .margin(16)
        .x_label_area_size(if rotate { 120 } else { 40 })
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..n as f64 - 0.5, lo..hi)?;

    let x_fmt = |x: &f64| category_label(categories, *x);
    let y_fmt = |y: &f64| format_value(*y);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(n.min(MAX_AXIS_LABELS))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(axis_font(rotate));
    if let Some(x) = &spec.labels.x {
        mesh.x_desc(x.as_str());
    }
    if let Some(y) = &spec.labels.y {
        mesh.y_desc(y.as_str());
    }
    mesh.draw()?;

    let slot = 0.8;
    let mut base = vec![0.0; n];
    for (s, line) in series.iter().enumerate() {
        let color = PALETTE[s % PALETTE.len()];
        match spec.kind {
            ChartKind::Line => {
                let points: Vec<(f64, f64)> = line
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, v)| (i as f64, *v))
                    .collect();
                chart
                    .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                    .label(line.name.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;
            }
            ChartKind::StackedBar => {
                let mut bars = Vec::new();
                for (i, v) in line.values.iter().enumerate() {
                    if !v.is_finite() {
                        continue;
                    }
                    let x = i as f64;
                    bars.push(Rectangle::new(
                        [(x - slot / 2.0, base[i]), (x + slot / 2.0, base[i] + v)],
                        color.filled(),
                    ));
                    base[i] += v;
                }
                chart
                    .draw_series(bars)?
                    .label(line.name.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            }
            _ => {
                let width = slot / series.len() as f64;
                let offset = -slot / 2.0 + s as f64 * width;
                chart
                    .draw_series(
                        line.values
                            .iter()
                            .enumerate()
                            .filter(|(_, v)| v.is_finite())
                            .map(|(i, v)| {
                                let x0 = i as f64 + offset;
                                Rectangle::new([(x0, 0.0), (x0 + width, *v)], color.filled())
                            }),
                    )?
                    .label(line.name.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            }
        }
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn draw_pie(root: &Area, spec: &ChartSpec, categories: &[String], values: &[f64]) -> DrawResult {
    let area = root.titled(&spec.title, TITLE_FONT)?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.36;

    let total: f64 = values.iter().filter(|v| v.is_finite() && **v > 0.0).sum();
    if total <= 0.0 {
        return Err("every slice is zero".into());
    }

    let mut angle = -FRAC_PI_2;
    for (i, (label, v)) in categories.iter().zip(values).enumerate() {
        if !(v.is_finite() && *v > 0.0) {
            continue;
        }
        let color = PALETTE[i % PALETTE.len()];
        let sweep = v / total * TAU;
        let steps = ((sweep / TAU) * 180.0).ceil().max(2.0) as usize;

        let mut wedge = vec![center];
        wedge.extend((0..=steps).map(|k| {
            let a = angle + sweep * k as f64 / steps as f64;
            polar(center, radius, a)
        }));
        area.draw(&Polygon::new(wedge, color.filled()))?;

        let mid = angle + sweep / 2.0;
        let anchor = if mid.cos() >= 0.0 { HPos::Left } else { HPos::Right };
        let style = TextStyle::from(AXIS_FONT.into_font()).pos(Pos::new(anchor, VPos::Center));
        area.draw(&Text::new(
            format!("{} ({:.1}%)", truncate(label), v / total * 100.0),
            polar(center, radius * 1.12, mid),
            style,
        ))?;
        angle += sweep;
    }
    Ok(())
}

fn draw_matrix(
    root: &Area,
    spec: &ChartSpec,
    rows: &[String],
    columns: &[String],
    cells: &[Vec<f64>],
    diverging: bool,
) -> DrawResult {
    let (nr, nc) = (rows.len(), columns.len());
    let rotate = needs_rotation(columns);
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, TITLE_FONT)
        .margin(16)
        .x_label_area_size(if rotate { 120 } else { 40 })
        .y_label_area_size(160)
        .build_cartesian_2d(-0.5f64..nc as f64 - 0.5, -0.5f64..nr as f64 - 0.5)?;

    // Row 0 is drawn at the top.
    let x_fmt = |x: &f64| category_label(columns, *x);
    let y_fmt = |y: &f64| category_label(rows, nr as f64 - 1.0 - *y);
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_labels(nc.min(MAX_AXIS_LABELS))
        .y_labels(nr.min(MAX_AXIS_LABELS))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(axis_font(rotate));
    if let Some(x) = &spec.labels.x {
        mesh.x_desc(x.as_str());
    }
    if let Some(y) = &spec.labels.y {
        mesh.y_desc(y.as_str());
    }
    mesh.draw()?;

    let (lo, hi) = if diverging {
        (-1.0, 1.0)
    } else {
        finite_bounds(cells.iter().flatten().copied()).unwrap_or((0.0, 1.0))
    };
    let top = nr as f64 - 1.0;

    chart.draw_series(cells.iter().enumerate().flat_map(|(r, row)| {
        row.iter().enumerate().map(move |(c, v)| {
            let (x, y) = (c as f64, top - r as f64);
            Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                heat_color(*v, lo, hi, diverging).filled(),
            )
        })
    }))?;

    if nr * nc <= MAX_ANNOTATED_CELLS {
        let style = TextStyle::from(CELL_FONT.into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        chart.draw_series(cells.iter().enumerate().flat_map(|(r, row)| {
            let style = style.clone();
            row.iter().enumerate().map(move |(c, v)| {
                let text = if diverging && v.is_finite() {
                    format!("{:.2}", v)
                } else {
                    format_value(*v)
                };
                Text::new(text, (c as f64, top - r as f64), style.clone())
            })
        }))?;
    }
    Ok(())
}

fn draw_bubbles(
    root: &Area,
    spec: &ChartSpec,
    xs: &[String],
    ys: &[String],
    points: &[(usize, usize, f64)],
) -> DrawResult {
    let rotate = needs_rotation(xs);
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, TITLE_FONT)
        .margin(24)
        .x_label_area_size(if rotate { 120 } else { 40 })
        .y_label_area_size(100)
        .build_cartesian_2d(
            -0.5f64..xs.len() as f64 - 0.5,
            -0.5f64..ys.len() as f64 - 0.5,
        )?;

    let x_fmt = |x: &f64| category_label(xs, *x);
    let y_fmt = |y: &f64| category_label(ys, *y);
    let mut mesh = chart.configure_mesh();
    mesh.x_labels(xs.len().min(MAX_AXIS_LABELS))
        .y_labels(ys.len().min(MAX_AXIS_LABELS))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(axis_font(rotate));
    if let Some(x) = &spec.labels.x {
        mesh.x_desc(x.as_str());
    }
    if let Some(y) = &spec.labels.y {
        mesh.y_desc(y.as_str());
    }
    mesh.draw()?;

    let max = points
        .iter()
        .map(|p| p.2)
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    if max <= 0.0 {
        return Ok(());
    }
    chart.draw_series(
        points
            .iter()
            .filter(|p| p.2.is_finite() && p.2 > 0.0)
            .map(|&(x, y, v)| {
                let radius = BUBBLE_MIN_PX + (BUBBLE_MAX_PX - BUBBLE_MIN_PX) * (v / max).sqrt();
                let color = PALETTE[y % PALETTE.len()];
                Circle::new((x as f64, y as f64), radius as i32, color.mix(0.6).filled())
            }),
    )?;
    Ok(())
}

fn draw_boxes(root: &Area, spec: &ChartSpec, boxes: &[BoxSummary]) -> DrawResult {
    let boxes: Vec<&BoxSummary> = boxes.iter().filter(|b| b.count > 0).collect();
    let labels: Vec<String> = boxes.iter().map(|b| b.label.clone()).collect();
    let (lo, hi) = finite_bounds(boxes.iter().flat_map(|b| {
        [b.lower_whisker, b.upper_whisker]
            .into_iter()
            .chain(b.outliers.iter().copied())
    }))
    .map(|(lo, hi)| padded(lo, hi))
    .unwrap_or((0.0, 1.0));

    let rotate = needs_rotation(&labels);
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, TITLE_FONT)
        .margin(16)
        .x_label_area_size(if rotate { 120 } else { 40 })
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..boxes.len() as f64 - 0.5, lo..hi)?;

    let x_fmt = |x: &f64| category_label(&labels, *x);
    let y_fmt = |y: &f64| format_value(*y);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(boxes.len().min(MAX_AXIS_LABELS))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(axis_font(rotate));
    if let Some(y) = &spec.labels.y {
        mesh.y_desc(y.as_str());
    }
    mesh.draw()?;

    for (i, b) in boxes.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let x = i as f64;
        let half = 0.3;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - half, b.q1), (x + half, b.q3)],
            color.mix(0.35).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - half, b.q1), (x + half, b.q3)],
            color.stroke_width(2),
        )))?;
        chart.draw_series([
            PathElement::new(vec![(x - half, b.median), (x + half, b.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(x, b.q3), (x, b.upper_whisker)], color.stroke_width(1)),
            PathElement::new(vec![(x, b.q1), (x, b.lower_whisker)], color.stroke_width(1)),
            PathElement::new(
                vec![(x - half / 2.0, b.upper_whisker), (x + half / 2.0, b.upper_whisker)],
                color.stroke_width(1),
            ),
            PathElement::new(
                vec![(x - half / 2.0, b.lower_whisker), (x + half / 2.0, b.lower_whisker)],
                color.stroke_width(1),
            ),
        ])?;
        chart.draw_series(b.outliers.iter().map(|v| Circle::new((x, *v), 3, color.filled())))?;
        chart.draw_series(std::iter::once(Cross::new((x, b.mean), 4, BLACK.stroke_width(2))))?;
    }
    Ok(())
}

fn draw_histogram(root: &Area, spec: &ChartSpec, bins: &[HistogramBin]) -> DrawResult {
    let start = bins.first().map(|b| b.start).unwrap_or(0.0);
    let end = bins.last().map(|b| b.end).unwrap_or(1.0);
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, TITLE_FONT)
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(start..end, 0f64..max * 1.1)?;

    let x_fmt = |x: &f64| format_value(*x);
    let y_fmt = |y: &f64| format_value(*y);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .y_desc(spec.labels.y.as_deref().unwrap_or("Count"));
    if let Some(x) = &spec.labels.x {
        mesh.x_desc(x.as_str());
    }
    mesh.draw()?;

    let color = PALETTE[0];
    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], color.mix(0.8).filled())
    }))?;
    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
    }))?;
    Ok(())
}

/// Label of the category at integral position `x`; blank between categories.
fn category_label(categories: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    categories
        .get(i as usize)
        .map(|c| truncate(c))
        .unwrap_or_default()
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let cut: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{}…", cut)
    }
}

fn needs_rotation(categories: &[String]) -> bool {
    categories.len() > 8 || categories.iter().any(|c| c.chars().count() > 12)
}

fn axis_font(rotate: bool) -> FontDesc<'static> {
    if rotate {
        AXIS_FONT.into_font().transform(FontTransform::Rotate90)
    } else {
        AXIS_FONT.into_font()
    }
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}

/// Y range covering zero and every finite value, stacked per category if asked.
fn value_range(series: &[Series], n: usize, stacked: bool) -> (f64, f64) {
    let values: Vec<f64> = if stacked {
        (0..n)
            .map(|i| {
                series
                    .iter()
                    .filter_map(|s| s.values.get(i).copied())
                    .filter(|v| v.is_finite())
                    .sum()
            })
            .collect()
    } else {
        series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .collect()
    };
    let lo = values.iter().copied().fold(0.0, f64::min);
    let hi = values.iter().copied().fold(0.0, f64::max);
    padded(lo, hi)
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi <= lo {
        return (lo - 0.5, lo + 0.5);
    }
    let pad = (hi - lo) * 0.08;
    (if lo < 0.0 { lo - pad } else { lo }, hi + pad)
}

fn finite_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn heat_color(v: f64, lo: f64, hi: f64, diverging: bool) -> RGBColor {
    if !v.is_finite() {
        return MISSING;
    }
    if diverging {
        if v < 0.0 {
            lerp(WHITE, HEAT_NEG, -v)
        } else {
            lerp(WHITE, HEAT_POS, v)
        }
    } else if hi > lo {
        lerp(HEAT_LOW, HEAT_POS, (v - lo) / (hi - lo))
    } else {
        HEAT_POS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::spec::ChartLabels;

    #[test]
    fn category_labels_only_at_integers() {
        let cats = vec!["Gaza".to_string(), "Hebron".to_string()];
        assert_eq!(category_label(&cats, 0.0), "Gaza");
        assert_eq!(category_label(&cats, 1.0000000001), "Hebron");
        assert_eq!(category_label(&cats, 0.5), "");
        assert_eq!(category_label(&cats, 2.0), "");
        assert_eq!(category_label(&cats, -1.0), "");
    }

    #[test]
    fn long_labels_are_truncated() {
        let label = "Khan Younis Governorate South";
        assert_eq!(truncate(label).chars().count(), MAX_LABEL_CHARS);
        assert_eq!(truncate("Rafah"), "Rafah");
    }

    #[test]
    fn stacked_range_uses_category_totals() {
        let series = vec![
            Series {
                name: "a".into(),
                values: vec![10.0, 1.0],
            },
            Series {
                name: "b".into(),
                values: vec![5.0, f64::NAN],
            },
        ];
        let (lo, hi) = value_range(&series, 2, true);
        assert_eq!(lo, 0.0);
        assert!(hi > 15.0 && hi < 17.0);
        let (_, hi) = value_range(&series, 2, false);
        assert!(hi > 10.0 && hi < 11.0);
    }

    #[test]
    fn heat_colors() {
        assert_eq!(heat_color(1.0, -1.0, 1.0, true), HEAT_POS);
        assert_eq!(heat_color(-1.0, -1.0, 1.0, true), HEAT_NEG);
        assert_eq!(heat_color(0.0, 0.0, 10.0, false), HEAT_LOW);
        assert_eq!(heat_color(f64::NAN, 0.0, 10.0, false), MISSING);
    }

    fn spec(kind: ChartKind, data: ChartData) -> ChartSpec {
        ChartSpec {
            title: format!("{:?} chart", kind),
            kind,
            data,
            labels: ChartLabels {
                x: Some("Year".into()),
                y: Some("Fatalities".into()),
                date_format: None,
            },
            caption: "caption".into(),
        }
    }

    fn categorical(values: Vec<f64>) -> ChartData {
        ChartData::Categorical {
            categories: vec!["Gaza".into(), "Hebron".into(), "Jenin".into()],
            series: vec![
                Series {
                    name: "Events".into(),
                    values: values.clone(),
                },
                Series {
                    name: "Fatalities".into(),
                    values: values.iter().map(|v| v * 2.0).collect(),
                },
            ],
        }
    }

    fn summary(label: &str, shift: f64) -> BoxSummary {
        BoxSummary {
            label: label.into(),
            count: 12,
            mean: 5.0 + shift,
            q1: 3.0 + shift,
            median: 5.0 + shift,
            q3: 7.0 + shift,
            lower_whisker: 1.0 + shift,
            upper_whisker: 9.0 + shift,
            outliers: vec![15.0 + shift],
        }
    }

    fn assert_drawn(renderer: &ChartRenderer, spec: &ChartSpec) {
        let artifact = renderer.render("t", spec).unwrap();
        assert_eq!(artifact.title, spec.title);
        assert_eq!(artifact.caption, "caption");
        assert_eq!(
            artifact.size(),
            Some([renderer.width as usize, renderer.height as usize])
        );
        let image = artifact.image.as_ref().unwrap();
        assert!(
            image.pixels().any(|p| p.0 != [255, 255, 255]),
            "{} left the canvas white",
            spec.title
        );
    }

    #[test]
    fn every_chart_kind_draws_onto_the_canvas() {
        let renderer = ChartRenderer::new(ChartSize {
            width: 480,
            height: 320,
        });
        let specs = vec![
            spec(ChartKind::Line, categorical(vec![3.0, 8.0, 5.0])),
            spec(ChartKind::Bar, categorical(vec![3.0, 8.0, 5.0])),
            spec(ChartKind::StackedBar, categorical(vec![3.0, 8.0, 5.0])),
            spec(
                ChartKind::Pie,
                ChartData::Categorical {
                    categories: vec!["killed female".into(), "killed male".into()],
                    series: vec![Series {
                        name: "Killed".into(),
                        values: vec![3.0, 7.0],
                    }],
                },
            ),
            spec(
                ChartKind::Heatmap,
                ChartData::Matrix {
                    rows: vec!["Gaza".into(), "Rafah".into()],
                    columns: vec!["2023".into(), "2024".into()],
                    cells: vec![vec![700.0, 400.0], vec![0.0, 250.0]],
                    diverging: false,
                },
            ),
            spec(
                ChartKind::Heatmap,
                ChartData::Matrix {
                    rows: vec!["Events".into(), "Fatalities".into()],
                    columns: vec!["Events".into(), "Fatalities".into()],
                    cells: vec![vec![1.0, -0.4], vec![-0.4, 1.0]],
                    diverging: true,
                },
            ),
            spec(
                ChartKind::Bubble,
                ChartData::Bubbles {
                    x: vec!["Gaza".into(), "Rafah".into()],
                    y: vec!["2023".into(), "2024".into()],
                    points: vec![(0, 0, 700.0), (0, 1, 400.0), (1, 1, 250.0)],
                },
            ),
            spec(
                ChartKind::BoxPlot,
                ChartData::Boxes(vec![summary("Price 2022", 0.0), summary("Price 2023", 2.0)]),
            ),
            spec(
                ChartKind::Histogram,
                ChartData::Bins(vec![
                    HistogramBin {
                        start: 0.0,
                        end: 10.0,
                        count: 4,
                    },
                    HistogramBin {
                        start: 10.0,
                        end: 20.0,
                        count: 9,
                    },
                    HistogramBin {
                        start: 20.0,
                        end: 30.0,
                        count: 2,
                    },
                ]),
            ),
        ];
        for spec in &specs {
            assert_drawn(&renderer, spec);
        }
    }

    #[test]
    fn bars_of_zeros_still_draw_axes() {
        let renderer = ChartRenderer::new(ChartSize::default());
        assert_drawn(&renderer, &spec(ChartKind::Bar, categorical(vec![0.0, 0.0, 0.0])));
    }

    #[test]
    fn charts_without_data_come_back_blank() {
        let renderer = ChartRenderer::new(ChartSize::default());
        let empty_bins = spec(ChartKind::Histogram, ChartData::Bins(Vec::new()));
        let artifact = renderer.render("t", &empty_bins).unwrap();
        assert!(artifact.is_blank());
        assert_eq!(artifact.size(), None);
        assert_eq!(artifact.caption, "caption");

        let zero_pie = spec(
            ChartKind::Pie,
            ChartData::Categorical {
                categories: vec!["Killed".into(), "Injured".into()],
                series: vec![Series {
                    name: "Impact".into(),
                    values: vec![0.0, 0.0],
                }],
            },
        );
        assert!(renderer.render("t", &zero_pie).unwrap().is_blank());
    }
}
