//! Dashboard module - per-category orchestration, routing and dataset caching

pub mod cache;
#[allow(clippy::module_inception)]
pub mod dashboard;
pub mod router;

pub use cache::DatasetCache;
pub use dashboard::{Dashboard, HeadlineValue, Metrics, Preview, Report};
pub use router::Router;
