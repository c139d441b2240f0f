// Draft oracle entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the draft backend (REST or simulated)
// 4. Create mpsc channels
// 5. Spawn app logic task
// 6. Run the TUI until the user quits
// 7. Cleanup on exit

use std::sync::Arc;

use draft_oracle::app;
use draft_oracle::backend::http::HttpBackend;
use draft_oracle::backend::simulated::SimulatedBackend;
use draft_oracle::backend::DraftBackend;
use draft_oracle::config::{self, BackendMode};
use draft_oracle::draft::manager::DraftManager;
use draft_oracle::tui;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Draft oracle starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let policy = config.polling.policy();
    info!(
        "Config loaded: backend={:?}, polling {} x {}ms",
        config.backend.mode, policy.max_attempts, config.polling.interval_ms
    );

    // 3. Build the backend
    let backend: Arc<dyn DraftBackend> = match config.backend.mode {
        BackendMode::Http => {
            let backend = HttpBackend::from_config(&config.api)
                .context("failed to build HTTP backend")?;
            info!("Using draft service at {}", config.api.base_url);
            Arc::new(backend)
        }
        BackendMode::Simulated => {
            info!(
                "Using simulated backend: {} teams, {} rounds",
                config.simulation.draft_order.len(),
                config.simulation.num_rounds
            );
            Arc::new(SimulatedBackend::new(&config.simulation))
        }
    };
    let manager = Arc::new(DraftManager::new(backend, policy));

    // 4. Create mpsc channels
    let (run_tx, run_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 5. Spawn app logic task
    let app_state = app::AppState::new(manager, run_tx);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, run_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Run the TUI event loop (blocking until user quits)
    info!("Application ready");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 7. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Draft oracle shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draft-oracle.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draft_oracle=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
