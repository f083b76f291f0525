//! Report Viewer Widget
//! Scrollable report area: metric cards, summary table, chart images and
//! captions, or an explicit empty/error panel. Never shows stale charts.

use crate::dashboard::{HeadlineValue, Preview, Report};
use crate::format::{format_number, format_value};
use crate::stats::ColumnSummary;
use egui::{Color32, ColorImage, RichText, ScrollArea, TextureHandle, TextureOptions};

const CARD_WIDTH: f32 = 180.0;
const CHART_SPACING: f32 = 15.0;

enum ViewState {
    Idle,
    Report {
        report: Report,
        textures: Vec<Option<TextureHandle>>,
    },
    NoData(String),
    Error(String),
}

pub struct ChartViewer {
    state: ViewState,
}

impl Default for ChartViewer {
    fn default() -> Self {
        Self {
            state: ViewState::Idle,
        }
    }
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_report(&mut self, report: Report) {
        self.state = ViewState::Report {
            report,
            textures: Vec::new(),
        };
    }

    pub fn show_no_data(&mut self, message: String) {
        self.state = ViewState::NoData(message);
    }

    pub fn show_error(&mut self, message: String) {
        self.state = ViewState::Error(message);
    }

    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        match &mut self.state {
            ViewState::Idle => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("Select a category").size(20.0));
                });
            }
            ViewState::NoData(message) => {
                Self::draw_panel(
                    ui,
                    "No data for the current selection",
                    message,
                    Color32::from_rgb(243, 156, 18),
                );
            }
            ViewState::Error(message) => {
                Self::draw_panel(ui, "Error", message, Color32::from_rgb(220, 53, 69));
            }
            ViewState::Report { report, textures } => {
                if textures.len() != report.charts.len() {
                    *textures = report
                        .charts
                        .iter()
                        .enumerate()
                        .map(|(i, chart)| {
                            let (image, size) = chart.image.as_ref().zip(chart.size())?;
                            Some(ctx.load_texture(
                                format!("chart-{}-{}", i, chart.title),
                                ColorImage::from_rgb(size, image.as_raw()),
                                TextureOptions::LINEAR,
                            ))
                        })
                        .collect();
                }
                ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| Self::draw_report(ui, report, textures));
            }
        }
    }

    fn draw_panel(ui: &mut egui::Ui, heading: &str, message: &str, color: Color32) {
        ui.add_space(20.0);
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(2.0, color))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.label(RichText::new(heading).size(18.0).strong().color(color));
                ui.add_space(6.0);
                ui.label(RichText::new(message).size(13.0));
            });
    }

    fn draw_report(ui: &mut egui::Ui, report: &Report, textures: &[Option<TextureHandle>]) {
        ui.label(RichText::new(&report.title).size(24.0).strong());
        if let Some(intro) = &report.intro {
            ui.add_space(4.0);
            ui.label(intro);
        }
        ui.add_space(CHART_SPACING);

        if !report.headline.is_empty() {
            ui.horizontal_wrapped(|ui| {
                for card in &report.headline {
                    Self::draw_metric_card(ui, card);
                }
            });
            ui.add_space(CHART_SPACING);
        }

        if !report.summary.is_empty() {
            ui.label(RichText::new("Summary statistics").size(16.0).strong());
            Self::draw_summary_table(ui, &report.summary);
            ui.add_space(CHART_SPACING);
        }

        if let Some(preview) = &report.preview {
            ui.label(RichText::new("Dataset Preview").size(16.0).strong());
            Self::draw_preview_table(ui, preview);
            ui.add_space(CHART_SPACING);
        }

        let width = ui.available_width();
        for (chart, texture) in report.charts.iter().zip(textures) {
            egui::Frame::none()
                .rounding(8.0)
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .inner_margin(12.0)
                .show(ui, |ui| {
                    match texture {
                        Some(texture) => {
                            ui.add(
                                egui::Image::new(texture)
                                    .max_width(width - 24.0)
                                    .maintain_aspect_ratio(true),
                            );
                        }
                        None => {
                            ui.set_width(width - 24.0);
                            ui.label(RichText::new(&chart.title).size(16.0).strong());
                            ui.add_space(6.0);
                            ui.label(
                                RichText::new("No data for this chart in the current selection")
                                    .color(Color32::from_rgb(243, 156, 18)),
                            );
                        }
                    }
                    if !chart.caption.is_empty() {
                        ui.add_space(6.0);
                        ui.label(RichText::new(&chart.caption).size(13.0));
                    }
                });
            ui.add_space(CHART_SPACING);
        }

        for paragraph in &report.conclusion {
            ui.label(paragraph);
            ui.add_space(6.0);
        }
    }

    fn draw_metric_card(ui: &mut egui::Ui, card: &HeadlineValue) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.set_width(CARD_WIDTH);
                ui.label(RichText::new(&card.label).size(12.0).color(Color32::GRAY));
                ui.label(RichText::new(format_value(card.value)).size(22.0).strong());
            });
    }

    /// Draw statistics table
    fn draw_summary_table(ui: &mut egui::Ui, summary: &[ColumnSummary]) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new("summary_table")
                    .striped(true)
                    .min_col_width(55.0)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for header in ["Column", "N", "Mean", "Std", "Min", "25%", "Median", "75%", "Max"] {
                            ui.label(RichText::new(header).strong().size(11.0));
                        }
                        ui.end_row();

                        for row in summary {
                            ui.label(RichText::new(&row.column).size(11.0));
                            ui.label(RichText::new(format_number(row.count as f64, 0)).size(11.0));
                            for value in [row.mean, row.std, row.min, row.p25, row.median, row.p75, row.max] {
                                ui.label(RichText::new(format_number(value, 2)).size(11.0));
                            }
                            ui.end_row();
                        }
                    });
            });
    }

    fn draw_preview_table(ui: &mut egui::Ui, preview: &Preview) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ScrollArea::horizontal().id_salt("preview_scroll").show(ui, |ui| {
                    egui::Grid::new("preview_table")
                        .striped(true)
                        .spacing([10.0, 4.0])
                        .show(ui, |ui| {
                            for column in &preview.columns {
                                ui.label(RichText::new(column).strong().size(11.0));
                            }
                            ui.end_row();

                            for row in &preview.rows {
                                for cell in row {
                                    ui.label(RichText::new(cell).size(11.0));
                                }
                                ui.end_row();
                            }
                        });
                });
            });
    }
}
