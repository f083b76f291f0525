//! Charts module - binding aggregates to chart kinds and drawing them

pub mod renderer;
pub mod spec;

pub use renderer::{ChartArtifact, ChartRenderer, PALETTE};
pub use spec::{ChartData, ChartLabels, ChartSpec, Series};
