//! Inventory demand forecasting.
//!
//! Merges a flat-file source with a SQL query result, cleans the merged
//! table, fits a seeded tree ensemble on the configured features and writes
//! the table back out with a `predicted_demand` column.

pub mod data;
pub mod error;
pub mod export;
pub mod ml;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig, PipelineFailure, PipelineOutcome, PipelineRequest};
