//! Core engine: reading the sheet, presenting ratios, running cycles.

pub mod cycle;
pub mod presenter;
pub mod reader;
