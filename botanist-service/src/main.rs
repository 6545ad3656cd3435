use botanist_service::config::BotanistConfig;
use botanist_service::services::metrics::init_metrics;
use botanist_service::Application;
use service_core::observability::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotanistConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "botanist-service",
        &config.common.log_level,
        config.otlp_endpoint.as_deref(),
    )?;
    init_metrics();

    tracing::info!(environment = %config.environment, "Starting botanist-service");

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    shutdown_tracing();
    Ok(())
}
