//! Stats module - aggregation of filtered views

pub mod aggregator;
pub mod result;

pub use aggregator::Aggregator;
pub use result::*;
