//! # Bugtriage API Main Entry Point
//!
//! This is the main entry point for the Bugtriage API service.

use bugtriage::{
    config::ConfigLoader,
    db::{health_check, init_pool},
    server::run_server,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;
    health_check(&db).await?;

    use migration::MigratorTrait;
    migration::Migrator::up(&db, None).await?;

    run_server(config, db).await
}
