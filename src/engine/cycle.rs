//! One refresh cycle: connect → open worksheet → read row → present.
//!
//! Every cycle starts from scratch with a new connection. Empty and
//! malformed data still produce a view; authentication and store failures
//! are returned to the caller, which decides whether they end the process.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::presenter::Presenter;
use super::reader;
use crate::config::SheetSecrets;
use crate::dashboard::routes::DashboardState;
use crate::sheets::SheetConnector;
use crate::types::{DashboardError, DashboardView};

pub struct RefreshCycle {
    connector: Box<dyn SheetConnector>,
    secrets: SheetSecrets,
    presenter: Presenter,
}

impl RefreshCycle {
    pub fn new(connector: Box<dyn SheetConnector>, secrets: SheetSecrets, presenter: Presenter) -> Self {
        Self {
            connector,
            secrets,
            presenter,
        }
    }

    /// Run a full cycle. `Err` only for fatal conditions.
    pub async fn run(&self) -> Result<DashboardView, DashboardError> {
        let started = Instant::now();

        let service =
            reader::connect(self.connector.as_ref(), &self.secrets.service_account_key).await?;
        let worksheet = reader::open_worksheet(
            service.as_ref(),
            &self.secrets.spreadsheet_id,
            &self.secrets.worksheet_name,
        )
        .await?;
        let raw = reader::read_latest(&worksheet).await?;
        debug!(
            worksheet = worksheet.title(),
            created = worksheet.was_created(),
            has_row = raw.is_some(),
            "Row read"
        );

        let view = self.presenter.present(raw);
        info!(
            outcome = %view,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );
        Ok(view)
    }

    /// Run a cycle, turning a fatal error into an error banner so the
    /// dashboard keeps serving while the next cycle retries.
    pub async fn run_or_report(&self) -> (DashboardView, Option<DashboardError>) {
        match self.run().await {
            Ok(view) => (view, None),
            Err(e) => (self.presenter.render_unavailable(&e), Some(e)),
        }
    }

    /// Re-run the cycle after every `pause`, publishing each view, until
    /// `shutdown` resolves. A cycle still in flight is abandoned on
    /// shutdown. Returns the number of cycles published.
    pub async fn run_until<F>(&self, state: &DashboardState, pause: Duration, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut published = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                outcome = self.run_or_report() => Some(outcome),
            };
            let Some((view, err)) = outcome else {
                info!("Shutdown during a cycle; abandoning it");
                break;
            };

            if let Some(e) = err {
                error!(error = %e, "Cycle failed; retrying after the next pause");
            }
            state.publish(view).await;
            published += 1;
        }

        published
    }
}
