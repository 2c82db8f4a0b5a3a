//! Bootstrap binary: prepares the database and reports the ledger state.

use qurban_savings::{
    config::{self, database},
    core::{saver::list_active_savers, status::seed_target},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenvy::dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and ensure the schema
    let database_url = database::get_database_url(app_config.database_url.as_deref());
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Make sure a target is stored
    let target = seed_target(&db, app_config.default_target).await?;

    let savers = list_active_savers(&db).await?;
    let paid_off = savers.iter().filter(|s| s.paid_off).count();
    info!(
        active_savers = savers.len(),
        paid_off,
        %target,
        "Qurban savings ledger ready"
    );

    Ok(())
}
