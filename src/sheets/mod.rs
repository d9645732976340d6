//! Spreadsheet service integration.
//!
//! Defines the `SpreadsheetService` trait (the handful of Sheets calls the
//! reader needs) and the `SheetConnector` trait that turns a service-account
//! key into an authenticated service. The Google implementation lives in
//! [`google`]; tests substitute in-memory or mocked services.

pub mod auth;
pub mod google;

use async_trait::async_trait;

use crate::types::DashboardError;
use auth::ServiceAccountKey;

/// OAuth scopes requested for every connection.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Abstraction over a spreadsheet backend.
///
/// Cell values travel as text in row-major order, matching the
/// `FORMATTED_VALUE` rendering of the Sheets API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpreadsheetService: Send + Sync {
    /// Titles of every worksheet in the spreadsheet.
    async fn worksheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, DashboardError>;

    /// Add a worksheet with the given grid size.
    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), DashboardError>;

    /// Overwrite the cells of an A1 range.
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), DashboardError>;

    /// Read an A1 range. Trailing empty rows and cells are omitted.
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, DashboardError>;
}

/// Builds an authenticated [`SpreadsheetService`] from credentials.
#[async_trait]
pub trait SheetConnector: Send + Sync {
    async fn connect(
        &self,
        key: &ServiceAccountKey,
    ) -> Result<Box<dyn SpreadsheetService>, DashboardError>;
}

/// Qualify a cell range with a worksheet title, e.g. `'latest'!A1:D2`.
///
/// Titles are always quoted; embedded single quotes are doubled.
pub fn a1_range(title: &str, cells: &str) -> String {
    format!("'{}'!{cells}", title.replace('\'', "''"))
}
