//! Remote store reader.
//!
//! Connects with the service-account key, opens (or creates) the target
//! worksheet, and reads the header row plus the single data row beneath it.

use tracing::{debug, info};

use crate::sheets::auth::ServiceAccountKey;
use crate::sheets::{a1_range, SheetConnector, SpreadsheetService};
use crate::types::{DashboardError, RawRecord, HEADER};

/// Grid size of a worksheet created by the reader.
pub const NEW_WORKSHEET_ROWS: u32 = 10;
pub const NEW_WORKSHEET_COLS: u32 = 6;

const HEADER_CELLS: &str = "A1:D1";
const LATEST_CELLS: &str = "A1:D2";

/// A worksheet located inside a spreadsheet.
pub struct Worksheet<'a> {
    service: &'a dyn SpreadsheetService,
    spreadsheet_id: String,
    title: String,
    created: bool,
}

impl<'a> Worksheet<'a> {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether this open created the worksheet.
    pub fn was_created(&self) -> bool {
        self.created
    }
}

/// Build an authenticated client from the key.
pub async fn connect(
    connector: &dyn SheetConnector,
    key: &ServiceAccountKey,
) -> Result<Box<dyn SpreadsheetService>, DashboardError> {
    key.validate()?;
    connector.connect(key).await
}

/// Look up `name` in the spreadsheet, creating it with the header row if
/// it does not exist yet. Opening an existing worksheet writes nothing.
pub async fn open_worksheet<'a>(
    service: &'a dyn SpreadsheetService,
    spreadsheet_id: &str,
    name: &str,
) -> Result<Worksheet<'a>, DashboardError> {
    let titles = service.worksheet_titles(spreadsheet_id).await?;
    debug!(spreadsheet_id, worksheets = titles.len(), "Spreadsheet opened");

    let created = if titles.iter().any(|t| t == name) {
        false
    } else {
        service
            .add_worksheet(spreadsheet_id, name, NEW_WORKSHEET_ROWS, NEW_WORKSHEET_COLS)
            .await?;
        let header = vec![HEADER.iter().map(|h| h.to_string()).collect()];
        service
            .update_values(spreadsheet_id, &a1_range(name, HEADER_CELLS), header)
            .await?;
        info!(spreadsheet_id, worksheet = name, "Created missing worksheet with header row");
        true
    };

    Ok(Worksheet {
        service,
        spreadsheet_id: spreadsheet_id.to_string(),
        title: name.to_string(),
        created,
    })
}

/// Read rows 1–2, columns A–D.
///
/// Returns `None` when there is no complete data row: fewer than two rows,
/// or a second row with fewer than four cells. The API drops trailing empty
/// cells, so a row with a blank last column also lands here.
pub async fn read_latest(worksheet: &Worksheet<'_>) -> Result<Option<RawRecord>, DashboardError> {
    let rows = worksheet
        .service
        .get_values(
            &worksheet.spreadsheet_id,
            &a1_range(&worksheet.title, LATEST_CELLS),
        )
        .await?;

    match rows.as_slice() {
        [header, values, ..] if values.len() >= HEADER.len() => {
            Ok(Some(RawRecord::from_rows(header, values)))
        }
        _ => {
            debug!(
                worksheet = %worksheet.title,
                rows = rows.len(),
                "No complete data row"
            );
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
