//! In-memory spreadsheet for integration testing.
//!
//! Provides a deterministic `SpreadsheetService` that stores worksheets as
//! string grids and mimics the Sheets API's trimming of trailing empty
//! cells and rows, plus a `SheetConnector` that hands it out.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ratios_dashboard::sheets::auth::ServiceAccountKey;
use ratios_dashboard::sheets::{SheetConnector, SpreadsheetService};
use ratios_dashboard::types::{DashboardError, HEADER};

pub const SPREADSHEET_ID: &str = "sheet-123";

#[derive(Debug, Clone)]
pub struct Worksheet {
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<Vec<String>>,
}

/// A mock spreadsheet. Clones share state, so tests keep a handle while
/// the connector hands copies to each cycle.
#[derive(Clone, Default)]
pub struct MemorySheets {
    worksheets: Arc<Mutex<HashMap<String, Worksheet>>>,
    calls: Arc<Mutex<Vec<String>>>,
    /// If set, every call fails with `StoreUnavailable(msg)`.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spreadsheet with one worksheet holding the given rows.
    pub fn with_rows(title: &str, rows: Vec<Vec<&str>>) -> Self {
        let sheets = Self::new();
        sheets.worksheets.lock().unwrap().insert(
            title.to_string(),
            Worksheet {
                rows: 1000,
                cols: 26,
                cells: rows
                    .into_iter()
                    .map(|r| r.into_iter().map(str::to_string).collect())
                    .collect(),
            },
        );
        sheets
    }

    /// Header plus one data row in the `latest` worksheet.
    pub fn with_record(values: [&str; 4]) -> Self {
        Self::with_rows("latest", vec![HEADER.to_vec(), values.to_vec()])
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn worksheet(&self, title: &str) -> Option<Worksheet> {
        self.worksheets.lock().unwrap().get(title).cloned()
    }

    /// Method names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == method).count()
    }

    fn record(&self, spreadsheet_id: &str, method: &str) -> Result<(), DashboardError> {
        self.calls.lock().unwrap().push(method.to_string());
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(DashboardError::StoreUnavailable(err.clone()));
        }
        if spreadsheet_id != SPREADSHEET_ID {
            return Err(DashboardError::StoreUnavailable(format!(
                "404 NOT_FOUND: spreadsheet {spreadsheet_id}"
            )));
        }
        Ok(())
    }
}

/// Split `'title'!A1:D2` into the title and zero-based inclusive bounds.
fn parse_range(range: &str) -> (String, (usize, usize), (usize, usize)) {
    let (title, cells) = range.rsplit_once('!').expect("range has a sheet title");
    let title = title
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(title)
        .replace("''", "'");
    let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
    (title, parse_cell(start), parse_cell(end))
}

fn parse_cell(cell: &str) -> (usize, usize) {
    let split = cell.find(|c: char| c.is_ascii_digit()).expect("cell has a row");
    let (letters, digits) = cell.split_at(split);
    let col = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1;
    let row = digits.parse::<usize>().expect("row number") - 1;
    (row, col)
}

#[async_trait]
impl SpreadsheetService for MemorySheets {
    async fn worksheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, DashboardError> {
        self.record(spreadsheet_id, "worksheet_titles")?;
        let mut titles: Vec<String> = self.worksheets.lock().unwrap().keys().cloned().collect();
        titles.sort();
        Ok(titles)
    }

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), DashboardError> {
        self.record(spreadsheet_id, "add_worksheet")?;
        let mut sheets = self.worksheets.lock().unwrap();
        if sheets.contains_key(title) {
            return Err(DashboardError::StoreUnavailable(format!(
                "400 INVALID_ARGUMENT: sheet {title} already exists"
            )));
        }
        sheets.insert(
            title.to_string(),
            Worksheet {
                rows,
                cols,
                cells: Vec::new(),
            },
        );
        Ok(())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), DashboardError> {
        self.record(spreadsheet_id, "update_values")?;
        let (title, (row0, col0), _) = parse_range(range);
        let mut sheets = self.worksheets.lock().unwrap();
        let sheet = sheets
            .get_mut(&title)
            .ok_or_else(|| DashboardError::StoreUnavailable(format!("no sheet {title}")))?;

        for (r, row) in values.into_iter().enumerate() {
            let target_row = row0 + r;
            if sheet.cells.len() <= target_row {
                sheet.cells.resize(target_row + 1, Vec::new());
            }
            let cells = &mut sheet.cells[target_row];
            for (c, value) in row.into_iter().enumerate() {
                let target_col = col0 + c;
                if cells.len() <= target_col {
                    cells.resize(target_col + 1, String::new());
                }
                cells[target_col] = value;
            }
        }
        Ok(())
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, DashboardError> {
        self.record(spreadsheet_id, "get_values")?;
        let (title, (row0, col0), (row1, col1)) = parse_range(range);
        let sheets = self.worksheets.lock().unwrap();
        let sheet = sheets
            .get(&title)
            .ok_or_else(|| DashboardError::StoreUnavailable(format!("no sheet {title}")))?;

        let mut out: Vec<Vec<String>> = (row0..=row1)
            .map(|r| {
                let mut row: Vec<String> = (col0..=col1)
                    .map(|c| {
                        sheet
                            .cells
                            .get(r)
                            .and_then(|cells| cells.get(c))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect();
                while row.last().is_some_and(|v| v.is_empty()) {
                    row.pop();
                }
                row
            })
            .collect();
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }
}

/// Hands out the shared [`MemorySheets`], or fails like a rejected key.
#[derive(Clone)]
pub struct MemoryConnector {
    pub sheets: MemorySheets,
    pub reject_credentials: bool,
    connects: Arc<Mutex<usize>>,
}

impl MemoryConnector {
    pub fn new(sheets: MemorySheets) -> Self {
        Self {
            sheets,
            reject_credentials: false,
            connects: Arc::new(Mutex::new(0)),
        }
    }

    pub fn rejecting(sheets: MemorySheets) -> Self {
        Self {
            reject_credentials: true,
            ..Self::new(sheets)
        }
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl SheetConnector for MemoryConnector {
    async fn connect(
        &self,
        _key: &ServiceAccountKey,
    ) -> Result<Box<dyn SpreadsheetService>, DashboardError> {
        *self.connects.lock().unwrap() += 1;
        if self.reject_credentials {
            return Err(DashboardError::Auth(
                "token request rejected (400): invalid_grant".into(),
            ));
        }
        Ok(Box::new(self.sheets.clone()))
    }
}
