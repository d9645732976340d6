//! Ratio presenter.
//!
//! Turns the raw sheet record into numbers, derives the current and
//! acid-test ratios, and produces the display model for the dashboard.
//! Rounding only happens when formatting; ratios are computed exactly.

use tracing::{info, warn};

use crate::types::{
    DashboardError, DashboardView, LatestRecord, Metric, RatioPair, RawRecord,
    FIELD_CURRENT_ASSETS, FIELD_CURRENT_LIABILITIES, FIELD_INVENTORY, FIELD_TIMESTAMP,
};

/// Shown in place of a ratio that cannot be computed.
pub const PLACEHOLDER: &str = "—";

pub const EMPTY_MESSAGE: &str =
    "No data found yet. Open the Data Generator to start emitting values.";
pub const MALFORMED_MESSAGE: &str = "Sheet has invalid numbers. Check row 2 (A2:D2).";
pub const UNAVAILABLE_MESSAGE: &str = "Spreadsheet could not be read this cycle.";

pub const CURRENT_RATIO_LABEL: &str = "Current Ratio";
pub const QUICK_RATIO_LABEL: &str = "Acid-Test (Quick) Ratio";

// ---------------------------------------------------------------------------
// Parsing and ratios
// ---------------------------------------------------------------------------

/// Coerce the three numeric fields. A missing or non-numeric field fails
/// with [`DashboardError::MalformedData`]; the timestamp is optional.
pub fn parse_record(raw: &RawRecord) -> Result<LatestRecord, DashboardError> {
    Ok(LatestRecord {
        timestamp_utc: raw.get(FIELD_TIMESTAMP).unwrap_or_default().to_string(),
        current_assets: parse_number(raw, FIELD_CURRENT_ASSETS)?,
        current_liabilities: parse_number(raw, FIELD_CURRENT_LIABILITIES)?,
        inventory: parse_number(raw, FIELD_INVENTORY)?,
    })
}

fn parse_number(raw: &RawRecord, field: &str) -> Result<f64, DashboardError> {
    let text = raw.get(field).ok_or_else(|| DashboardError::MalformedData {
        field: field.to_string(),
        value: String::new(),
    })?;

    text.trim()
        .parse::<f64>()
        .map_err(|_| DashboardError::MalformedData {
            field: field.to_string(),
            value: text.to_string(),
        })
}

/// Current ratio `ca / cl` and quick ratio `(ca - inv) / cl`.
///
/// Both are unavailable unless `cl > 0`, so a `nan` liability also yields
/// placeholders. No clamping: a quick ratio can be
/// negative when inventory exceeds current assets.
pub fn compute_ratios(ca: f64, cl: f64, inv: f64) -> RatioPair {
    if cl > 0.0 {
        RatioPair {
            current_ratio: Some(ca / cl),
            quick_ratio: Some((ca - inv) / cl),
        }
    } else {
        RatioPair::unavailable()
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Two decimals with comma thousands separators: `1234.5` → `"1,234.50"`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return format_non_finite(value);
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let len = int_part.len();
    let mut grouped = String::with_capacity(len + len / 3 + 4);
    if value.is_sign_negative() {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped.push('.');
    grouped.push_str(frac_part);
    grouped
}

/// Two decimals, or [`PLACEHOLDER`] when unavailable.
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) if r.is_finite() => format!("{r:.2}"),
        Some(r) => format_non_finite(r),
        None => PLACEHOLDER.to_string(),
    }
}

fn format_non_finite(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Builds [`DashboardView`]s. Holds only labelling preferences.
#[derive(Debug, Clone)]
pub struct Presenter {
    currency_symbol: String,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new("£")
    }
}

impl Presenter {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    fn amount_label(&self, name: &str) -> String {
        format!("{name} ({})", self.currency_symbol)
    }

    /// Full pipeline for one cycle's read result: absent record → empty
    /// state, unparsable record → error banner, otherwise metrics.
    pub fn present(&self, raw: Option<RawRecord>) -> DashboardView {
        let Some(raw) = raw else {
            warn!("Worksheet has no data row yet");
            return self.render_empty_state();
        };

        match parse_record(&raw) {
            Ok(record) => {
                let ratios = compute_ratios(
                    record.current_assets,
                    record.current_liabilities,
                    record.inventory,
                );
                info!(
                    record = %record,
                    current_ratio = %format_ratio(ratios.current_ratio),
                    quick_ratio = %format_ratio(ratios.quick_ratio),
                    "Ratios computed"
                );
                self.render(&record, &ratios)
            }
            Err(e) => {
                warn!(error = %e, "Data row is malformed");
                self.render_malformed(&e)
            }
        }
    }

    /// Three amounts, two ratios, and the timestamp caption when present.
    pub fn render(&self, record: &LatestRecord, ratios: &RatioPair) -> DashboardView {
        DashboardView::Metrics {
            amounts: vec![
                Metric::new(
                    self.amount_label("Current Assets"),
                    format_amount(record.current_assets),
                ),
                Metric::new(
                    self.amount_label("Current Liabilities"),
                    format_amount(record.current_liabilities),
                ),
                Metric::new(self.amount_label("Inventory"), format_amount(record.inventory)),
            ],
            ratios: vec![
                Metric::new(CURRENT_RATIO_LABEL, format_ratio(ratios.current_ratio)),
                Metric::new(QUICK_RATIO_LABEL, format_ratio(ratios.quick_ratio)),
            ],
            last_updated: Some(record.timestamp_utc.clone()).filter(|ts| !ts.is_empty()),
        }
    }

    pub fn render_empty_state(&self) -> DashboardView {
        DashboardView::Empty {
            message: EMPTY_MESSAGE.to_string(),
        }
    }

    pub fn render_malformed(&self, err: &DashboardError) -> DashboardView {
        DashboardView::Malformed {
            message: MALFORMED_MESSAGE.to_string(),
            detail: err.to_string(),
        }
    }

    pub fn render_unavailable(&self, err: &DashboardError) -> DashboardView {
        DashboardView::Unavailable {
            message: format!("{UNAVAILABLE_MESSAGE} {err}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
