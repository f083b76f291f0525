//! Conflict Impact Dashboards - desktop viewer
//!
//! Set `CONFLICT_DASH_CONFIG` to use a custom catalog, `CONFLICT_DASH_DATA`
//! to point at the data directory and `RUST_LOG` to change the log level.

use conflict_dash::config::AppConfig;
use conflict_dash::gui::ConflictDashApp;
use eframe::egui;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "{} dashboards, data directory {}",
        config.dashboards.len(),
        config.data_dir.display()
    );

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 700.0])
            .with_title("Conflict Impact Dashboards"),
        ..Default::default()
    };

    eframe::run_native(
        "Conflict Impact Dashboards",
        options,
        Box::new(move |cc| Ok(Box::new(ConflictDashApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
