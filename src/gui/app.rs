//! Conflict Dashboards Main Application
//! Main window with control panel and report viewer.

use crate::charts::ChartRenderer;
use crate::config::AppConfig;
use crate::dashboard::{Report, Router};
use crate::error::Result;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use egui::SidePanel;

/// Main application window.
pub struct ConflictDashApp {
    router: Router,
    renderer: ChartRenderer,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
}

impl ConflictDashApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let renderer = ChartRenderer::new(config.chart);
        let router = Router::new(config);
        let categories = router.categories().into_iter().map(String::from).collect();

        let mut app = Self {
            router,
            renderer,
            control_panel: ControlPanel::new(categories),
            chart_viewer: ChartViewer::new(),
        };
        if let Some(first) = app.control_panel.categories.first().cloned() {
            app.handle_category_changed(first);
        }
        app
    }

    /// Build (or reuse) the selected dashboard and render it.
    fn handle_category_changed(&mut self, label: String) {
        self.control_panel.selected = Some(label.clone());
        self.control_panel.filters.clear();

        let result = self.router.select(&label).and_then(|dashboard| {
            let options = dashboard.filter_options()?;
            self.control_panel
                .set_filters(options, dashboard.criteria());
            dashboard.render(&self.renderer)
        });
        self.show_result(&label, result);
    }

    /// Re-filter the current dashboard and render it.
    fn handle_filters_changed(&mut self) {
        let Some(label) = self.control_panel.selected.clone() else {
            return;
        };
        let criteria = self.control_panel.criteria();
        let result = self.router.select(&label).and_then(|dashboard| {
            dashboard.apply_filters(criteria)?;
            dashboard.render(&self.renderer)
        });
        self.show_result(&label, result);
    }

    fn show_result(&mut self, label: &str, result: Result<Report>) {
        match result {
            Ok(report) => {
                self.control_panel.status =
                    format!("{}: {} chart(s)", label, report.charts.len());
                self.chart_viewer.set_report(report);
            }
            Err(e) if e.is_empty_result() => {
                self.control_panel.status = format!("{}: no data for the selection", label);
                self.chart_viewer.show_no_data(e.to_string());
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.control_panel.status = format!("Error: {}", label);
                self.chart_viewer.show_error(e.to_string());
            }
        }
    }
}

impl eframe::App for ConflictDashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(260.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::CategoryChanged(label) => {
                            self.handle_category_changed(label)
                        }
                        ControlPanelAction::FiltersChanged => self.handle_filters_changed(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Report
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ctx, ui);
        });
    }
}
