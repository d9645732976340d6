//! Ratios dashboard entry point.
//!
//! Loads configuration and the secrets bundle, initialises structured
//! logging, runs the first cycle (fatal errors end the process), then
//! serves the dashboard while re-running the cycle after every pause.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use ratios_dashboard::config::{AppConfig, SheetSecrets};
use ratios_dashboard::dashboard::{self, routes::DashboardState};
use ratios_dashboard::engine::cycle::RefreshCycle;
use ratios_dashboard::engine::presenter::Presenter;
use ratios_dashboard::sheets::google::GoogleConnector;

const CONFIG_PATH_ENV: &str = "RATIOS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        secrets = %cfg.sheet.secrets_file,
        interval_secs = cfg.refresh.interval_secs,
        "Ratios dashboard starting up"
    );

    let secrets = SheetSecrets::load(&cfg.sheet.secrets_file)
        .with_context(|| format!("Failed to load secrets from {}", cfg.sheet.secrets_file))?;
    info!(
        spreadsheet_id = %secrets.spreadsheet_id,
        worksheet = %secrets.worksheet_name,
        client_email = %secrets.service_account_key.client_email,
        "Secrets loaded"
    );

    let cycle = RefreshCycle::new(
        Box::new(GoogleConnector::from_config(&cfg.sheet)),
        secrets,
        Presenter::new(cfg.dashboard.currency_symbol.clone()),
    );

    // A misconfigured sheet or key should stop the process, not sit
    // behind an error banner.
    let first = cycle
        .run()
        .await
        .context("Initial refresh failed; check credentials and spreadsheet access")?;

    let state = Arc::new(DashboardState::new(
        cfg.dashboard.title.clone(),
        cfg.refresh.interval_secs,
        first,
    ));
    dashboard::spawn_dashboard(state.clone(), &cfg.dashboard).await?;

    // -- Refresh loop ----------------------------------------------------

    let pause = Duration::from_secs(cfg.refresh.interval_secs);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received.");
    };

    info!(interval_secs = cfg.refresh.interval_secs, "Entering refresh loop. Press Ctrl+C to stop.");

    let cycles = cycle.run_until(&state, pause, shutdown).await;
    info!(cycles, "Refresh loop stopped");

    info!("Ratios dashboard shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ratios_dashboard=info"));

    if std::env::var("RATIOS_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
