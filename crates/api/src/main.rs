use std::sync::Arc;

use anyhow::Context;

use rentflow_api::app::{self, services::AppServices};
use rentflow_infra::{AppConfig, LoggingNotificationDispatcher, NotificationWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    rentflow_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.uses_default_jwt_secret() {
        tracing::warn!("RENTFLOW_JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to open fulfillment store")?;

    let notifications = NotificationWorker::spawn(
        &services.bus,
        Arc::new(LoggingNotificationDispatcher),
        config.notification_retry.clone(),
    );

    let app = app::build_app(services, &config.jwt_secret);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    notifications.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}
