//! Data module - loading, cleaning and filtering

pub mod cleaner;
pub mod filter;
pub mod loader;
pub mod value;

pub use cleaner::{CleanReport, DataCleaner, Dataset};
pub use filter::{FilterCriteria, FilterOption};
pub use loader::DataLoader;
pub use value::GroupKey;
