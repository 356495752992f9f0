mod app;
mod config;
mod routes;
mod services;
mod sink;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use timelapse_shared::overlay::HighlightDays;
use timelapse_shared::{Dataset, DatasetOptions};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let dataset_path = config::dataset_path();
    let options = DatasetOptions {
        denominator: config::denominator_strategy(),
        row_policy: config::row_policy(),
    };
    tracing::info!(path = %dataset_path.display(), ?options, "Loading activity dataset...");
    let dataset = match Dataset::load(&dataset_path, options) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!(error = %e, path = %dataset_path.display(), "failed to load dataset");
            return ExitCode::FAILURE;
        }
    };

    let (state, commands) = match AppState::new(Arc::new(dataset)) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize static payloads");
            return ExitCode::FAILURE;
        }
    };

    tokio::spawn(services::playback_driver::run(
        state.clone(),
        commands,
        HighlightDays::new(config::highlight_days()),
        config::tick_interval(),
    ));

    let app = app::build_app(state.clone(), config::static_dir());

    let addr = format!("0.0.0.0:{}", config::server_port());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Time-lapse server listening on {addr}");

    // Clients can reach the map from here on; release the playback driver.
    state.mark_sink_ready();

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server shut down gracefully");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
