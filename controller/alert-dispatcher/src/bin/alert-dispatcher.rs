//! Alert Dispatcher binary - serves the Alertmanager webhook

use alert_dispatcher::{
    server, service, AlertRouter, AppState, CapacityController, Config, HttpCommandService,
    HttpPoolService, Metrics, RemoteCommandExecutor,
};
use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse_config();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alert_dispatcher=debug,tower_http=info".into());
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    config.validate()?;

    info!("Starting Alert Dispatcher");
    info!("Configuration:");
    info!("  Listen address: {}", config.socket_addr());
    info!("  Command service: {}", config.command_service_url);
    info!("  Pool service: {}", config.pool_service_url);
    info!(
        "  Pool: {}",
        config.pool_name.as_deref().unwrap_or("<first group>")
    );
    info!("  Poll interval: {}ms", config.poll_interval_ms);
    info!("  Command timeout: {}s", config.command_timeout_secs);

    // One client shared by both remote services
    let client = service::build_http_client(config.http_timeout_secs)?;
    let commands = Arc::new(HttpCommandService::new(
        config.command_service_url.clone(),
        client.clone(),
    ));
    let pools = Arc::new(HttpPoolService::new(config.pool_service_url.clone(), client));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let router = AlertRouter::new(
        RemoteCommandExecutor::new(
            commands,
            config.poll_interval(),
            config.command_timeout(),
            shutdown_rx.clone(),
        ),
        CapacityController::new(pools, config.pool_name.clone()),
        config.scripts(),
        Metrics,
    );

    let listener = TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.socket_addr()))?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    match server::serve(listener, AppState::new(router), shutdown_rx).await {
        Ok(()) => {
            info!("Alert Dispatcher exited normally");
            Ok(())
        }
        Err(e) => {
            error!("Alert Dispatcher failed: {}", e);
            Err(e)
        }
    }
}
