use anyhow::Context;
use event_outbox::shared::application::outbox_drainer::OutboxDrainer;
use event_outbox::shared::infrastructure::database::postgres::PostgresDatabase;
use event_outbox::shared::infrastructure::event_log::clickhouse::ClickHouseEventLog;
use event_outbox::shell::config::Config;
use event_outbox::shell::workers::run_drainer;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(environment = %config.environment, "configuration loaded");

    let database = PostgresDatabase::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    tracing::info!("database connection established");

    database.migrate().await.context("failed to run migrations")?;
    tracing::info!("database migrations completed");

    let sink = ClickHouseEventLog::new(&config.event_log.url, &config.event_log.table)
        .with_credentials(config.event_log.user.clone(), config.event_log.password.clone());

    let drainer = OutboxDrainer::new(Arc::new(database), Arc::new(sink), config.drainer);

    run_drainer(drainer, config.drain_interval, async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await;

    tracing::info!("outbox drainer stopped");
    Ok(())
}
