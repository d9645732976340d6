//! Ratios dashboard — current and acid-test ratios from a Google Sheets row.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod sheets;
pub mod engine;
pub mod dashboard;
