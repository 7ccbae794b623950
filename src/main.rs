//! Reprise
//!
//! Main application entry point

use tracing::info;

use reprise::{
    config::Settings,
    database::{connection, DatabaseService},
    jobs::{JobContext, JobRunner},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging, keeping the guard alive for the process lifetime
    let _logging_guard = logging::init_logging(&settings.logging)?;

    info!("Starting Reprise scheduling engine...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = connection::DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: settings.database.min_connections,
        ..Default::default()
    };
    let db_pool = connection::create_pool(&db_config).await?;

    // Run database migrations
    connection::run_migrations(&db_pool).await?;

    // Initialize database service and providers
    let database_service = DatabaseService::new(db_pool);
    let services = ServiceFactory::new(&settings, &database_service)?;

    // Start the background jobs
    let ctx = JobContext {
        db: database_service,
        materializer: services.materializer.clone(),
        gateway: services.gateway.clone(),
        identity: services.identity.clone(),
        settings: settings.clone(),
    };
    let mut runner = JobRunner::new(ctx);
    runner.start();

    info!("Reprise is ready");

    // Run until interrupted
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, stopping jobs...");
    runner.stop();

    info!("Reprise has been shut down.");

    Ok(())
}
