pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod gate;
pub mod keys;
pub mod listing;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
pub use cli::{Cli, Commands, KeyCommands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config)?;

    match cli.command {
        None => run_server(config, None).await,
        Some(Commands::Serve { port }) => run_server(config, port).await,
        Some(Commands::Init) => cli::cmd_init(),
        Some(Commands::Keys { command }) => {
            config.validate()?;
            match command {
                KeyCommands::Generate { count, duration } => {
                    cli::cmd_keys_generate(&config, count, duration).await
                }
                KeyCommands::List { sort } => cli::cmd_keys_list(&config, sort.as_deref()).await,
                KeyCommands::MakeUnlimited => cli::cmd_keys_make_unlimited(&config).await,
                KeyCommands::PurgeOrphans => cli::cmd_keys_purge_orphans(&config).await,
            }
        }
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to initialize JSON logging")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to initialize logging")?;
    }
    Ok(())
}

fn install_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    config.validate()?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let prometheus_handle = install_metrics(&config)?;

    let port = config.server.port;
    info!(
        data_dir = %config.general.data_dir,
        images = %config.general.images_path,
        "Starting keymark"
    );

    let shared = Arc::new(SharedState::new(config).await?);
    let state = api::create_app_state(shared, prometheus_handle);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Web server error: {}", e);
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
