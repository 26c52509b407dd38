//! AWS-oriented adapters and handlers for the workbook sync functions.
//!
//! This crate owns runtime integration details (Lambda handlers, workbook and
//! object storage adapters, environment configuration) on top of the pure
//! primitives in `workbook_sync_core`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
