//! scumbag - multi-server IRC bot.

use std::sync::Arc;

use scumbag::config::{Config, validation};
use scumbag::db::Database;
use scumbag::dispatch::FanOut;
use scumbag::error::BotError;
use scumbag::handlers::Registry;
use scumbag::session::Supervisor;
use scumbag::state::BotState;
use scumbag::{http, metrics, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("Failed to load config {config_path}: {e}");
        e
    })?;

    telemetry::init_tracing(&config.bot);

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        return Err(BotError::from(errors).into());
    }

    info!(
        nick = %config.bot.nick,
        servers = config.servers.len(),
        version = %scumbag::handlers::version_string(),
        "Starting scumbag"
    );

    // Prometheus metrics are optional; metrics_port = 0 disables the endpoint.
    let metrics_port = config.bot.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let db = Database::new(&config.database.path).await?;
    info!(path = %config.database.path, "Database ready");

    let state = Arc::new(BotState::new(config.clone(), db));
    let registry = Arc::new(Registry::new());
    let fanout = FanOut::new(state, registry);
    let supervisor = Arc::new(Supervisor::new(&config, fanout));

    // Ctrl-C begins a coordinated shutdown; the process exits once every
    // session has terminated.
    {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received");
                    supervisor.shutdown_all().await;
                }
                Err(e) => error!(error = %e, "Failed to listen for interrupt"),
            }
        });
    }

    if let Err(e) = supervisor.start_all().await {
        error!(error = %e, "No session could connect");
        supervisor.shutdown_all().await;
        return Err(e.into());
    }

    supervisor.wait_all().await;
    supervisor.shutdown_all().await;
    info!("Shutdown complete");
    Ok(())
}
