//! Dashboard route handlers.
//!
//! The refresh loop publishes each cycle's view into `DashboardState`;
//! handlers only read the latest snapshot.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::DashboardView;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// The most recently rendered view.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub rendered_at: DateTime<Utc>,
    pub view: DashboardView,
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub title: String,
    pub refresh_secs: u64,
    snapshot: RwLock<Snapshot>,
}

impl DashboardState {
    /// Start from the view produced by the startup cycle.
    pub fn new(title: impl Into<String>, refresh_secs: u64, initial: DashboardView) -> Self {
        Self {
            title: title.into(),
            refresh_secs,
            snapshot: RwLock::new(Snapshot {
                cycle: 1,
                rendered_at: Utc::now(),
                view: initial,
            }),
        }
    }

    /// Replace the snapshot with a newer cycle's view.
    pub async fn publish(&self, view: DashboardView) -> u64 {
        let mut snapshot = self.snapshot.write().await;
        snapshot.cycle += 1;
        snapshot.rendered_at = Utc::now();
        snapshot.view = view;
        snapshot.cycle
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }
}

pub type AppState = Arc<DashboardState>;

/// Body of `GET /api/latest`. The page reads its title and poll interval
/// from here.
#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub title: String,
    pub refresh_secs: u64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/latest
pub async fn get_latest(State(state): State<AppState>) -> Json<LatestResponse> {
    Json(LatestResponse {
        title: state.title.clone(),
        refresh_secs: state.refresh_secs,
        snapshot: state.snapshot().await,
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
