//! Shared workbook sync domain primitives.
//!
//! This crate owns the deterministic parts of the sync functions: change
//! batching, filter formulas, schema and lookup resolution, export rendering,
//! and the event contracts the functions are invoked with. It intentionally
//! excludes AWS SDK and Lambda runtime concerns.

pub mod batcher;
pub mod change;
pub mod contract;
pub mod customers_csv;
pub mod export;
pub mod formula;
pub mod import_job;
pub mod lookup;
pub mod report;
pub mod schema;
pub mod workbook;
