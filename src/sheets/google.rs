//! Google Sheets API v4 client.
//!
//! API docs: https://developers.google.com/sheets/api/reference/rest
//! Base URL: https://sheets.googleapis.com/v4
//! Auth: `Authorization: Bearer {token}` from a service-account grant.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::auth::{self, ServiceAccountKey};
use super::{SheetConnector, SpreadsheetService, SCOPES};
use crate::config::SheetConfig;
use crate::types::DashboardError;

const USER_AGENT: &str = "ratios-dashboard/0.1.0";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

/// `GET spreadsheets/{id}?fields=sheets.properties.title`
#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grid_properties: Option<GridProperties>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    row_count: u32,
    column_count: u32,
}

#[derive(Debug, Serialize)]
struct BatchUpdateRequest {
    requests: Vec<SheetRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum SheetRequest {
    AddSheet { properties: SheetProperties },
}

/// Body and response of the `values` endpoints.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    range: String,
    #[serde(default)]
    major_dimension: String,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An authenticated Sheets client. Built fresh for every refresh cycle.
pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl GoogleSheetsClient {
    pub fn new(http: Client, base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    /// Attach the bearer token, send, and turn non-2xx into a domain error.
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, DashboardError> {
        let resp = req
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| DashboardError::StoreUnavailable(format!("{what} failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.error)
            .map(|e| format!("{} {}", e.status, e.message))
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => {
                DashboardError::Auth(format!("{what} unauthorised: {reason}"))
            }
            _ => DashboardError::StoreUnavailable(format!("{what} returned {status}: {reason}")),
        })
    }
}

/// Formatted values arrive as strings; anything else is stringified.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SpreadsheetService for GoogleSheetsClient {
    async fn worksheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, DashboardError> {
        let url = self.spreadsheet_url(spreadsheet_id);
        debug!(url = %url, "Fetching worksheet titles");

        let resp = self
            .send(
                self.http
                    .get(&url)
                    .query(&[("fields", "sheets.properties.title")]),
                "open spreadsheet",
            )
            .await?;

        let meta: SpreadsheetMeta = resp.json().await.map_err(|e| {
            DashboardError::StoreUnavailable(format!("unexpected spreadsheet response: {e}"))
        })?;

        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), DashboardError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(spreadsheet_id));
        let body = BatchUpdateRequest {
            requests: vec![SheetRequest::AddSheet {
                properties: SheetProperties {
                    title: title.to_string(),
                    grid_properties: Some(GridProperties {
                        row_count: rows,
                        column_count: cols,
                    }),
                },
            }],
        };

        debug!(url = %url, title, rows, cols, "Adding worksheet");
        self.send(self.http.post(&url).json(&body), "add worksheet")
            .await?;
        Ok(())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), DashboardError> {
        let url = self.values_url(spreadsheet_id, range);
        let body = ValueRange {
            range: range.to_string(),
            major_dimension: "ROWS".to_string(),
            values: values
                .into_iter()
                .map(|row| row.into_iter().map(serde_json::Value::String).collect())
                .collect(),
        };

        debug!(url = %url, "Updating values");
        self.send(
            self.http
                .put(&url)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
            "update values",
        )
        .await?;
        Ok(())
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, DashboardError> {
        let url = self.values_url(spreadsheet_id, range);
        debug!(url = %url, "Reading values");

        let resp = self.send(self.http.get(&url), "read values").await?;
        let range: ValueRange = resp.json().await.map_err(|e| {
            DashboardError::StoreUnavailable(format!("unexpected values response: {e}"))
        })?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Builds a [`GoogleSheetsClient`] with a new HTTP client and token on
/// every call. Nothing is pooled across cycles.
pub struct GoogleConnector {
    base_url: String,
    timeout: Duration,
}

impl GoogleConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &SheetConfig) -> Self {
        Self::new(
            cfg.api_base_url.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }
}

#[async_trait]
impl SheetConnector for GoogleConnector {
    async fn connect(
        &self,
        key: &ServiceAccountKey,
    ) -> Result<Box<dyn SpreadsheetService>, DashboardError> {
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DashboardError::Config(format!("failed to build HTTP client: {e}")))?;

        let token = auth::fetch_access_token(&http, key, &SCOPES).await?;
        info!(client_email = %key.client_email, "Authenticated with service account");

        Ok(Box::new(GoogleSheetsClient::new(
            http,
            self.base_url.clone(),
            token.token,
        )))
    }
}
