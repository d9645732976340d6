//! Shared types for the ratios dashboard.
//!
//! These types form the data model used across all modules: the raw
//! record read from the sheet, the parsed accounting figures, the derived
//! ratios, the display model, and the domain error taxonomy.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Sheet layout
// ---------------------------------------------------------------------------

pub const FIELD_TIMESTAMP: &str = "timestamp_utc";
pub const FIELD_CURRENT_ASSETS: &str = "current_assets";
pub const FIELD_CURRENT_LIABILITIES: &str = "current_liabilities";
pub const FIELD_INVENTORY: &str = "inventory";

/// Header row shared with the data generator. Column order is part of the
/// wire contract: A = timestamp, B = assets, C = liabilities, D = inventory.
pub const HEADER: [&str; 4] = [
    FIELD_TIMESTAMP,
    FIELD_CURRENT_ASSETS,
    FIELD_CURRENT_LIABILITIES,
    FIELD_INVENTORY,
];

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Row 2 of the worksheet keyed by the header names in row 1.
///
/// All values are still text here; numeric coercion is the presenter's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    /// Pair each header cell with the value in the same column.
    /// Columns without a header name are dropped.
    pub fn from_rows(header: &[String], values: &[String]) -> Self {
        let fields = header
            .iter()
            .zip(values)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// The latest accounting observation, parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestRecord {
    /// ISO-8601 timestamp as written by the generator, or empty.
    pub timestamp_utc: String,
    pub current_assets: f64,
    pub current_liabilities: f64,
    pub inventory: f64,
}

impl fmt::Display for LatestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CA: {:.2} | CL: {:.2} | INV: {:.2}",
            self.current_assets, self.current_liabilities, self.inventory,
        )?;
        if !self.timestamp_utc.is_empty() {
            write!(f, " @ {}", self.timestamp_utc)?;
        }
        Ok(())
    }
}

/// Liquidity ratios derived from a [`LatestRecord`].
///
/// Both ratios are `None` when liabilities are zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RatioPair {
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
}

impl RatioPair {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Display model
// ---------------------------------------------------------------------------

/// A single labelled figure on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// What the display surface shows for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    /// Figures and ratios from a valid data row.
    Metrics {
        amounts: Vec<Metric>,
        ratios: Vec<Metric>,
        last_updated: Option<String>,
    },
    /// Worksheet reachable but no data row yet.
    Empty { message: String },
    /// Data row present but not numeric.
    Malformed { message: String, detail: String },
    /// Store or credentials failed on a cycle after startup.
    Unavailable { message: String },
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardView::Metrics { .. } => write!(f, "METRICS"),
            DashboardView::Empty { .. } => write!(f, "EMPTY"),
            DashboardView::Malformed { .. } => write!(f, "MALFORMED"),
            DashboardView::Unavailable { .. } => write!(f, "UNAVAILABLE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the dashboard.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Spreadsheet unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed data: {field} = {value:?} is not a number")]
    MalformedData { field: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
