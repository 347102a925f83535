//! VIGIL Server — application entry point.

use std::env;

use tracing_subscriber::EnvFilter;

use vigil_db::{DbConfig, DbManager};

fn db_config_from_env() -> DbConfig {
    let defaults = DbConfig::default();
    DbConfig {
        url: env::var("VIGIL_DB_URL").unwrap_or(defaults.url),
        namespace: env::var("VIGIL_DB_NAMESPACE").unwrap_or(defaults.namespace),
        database: env::var("VIGIL_DB_DATABASE").unwrap_or(defaults.database),
        username: env::var("VIGIL_DB_USERNAME").unwrap_or(defaults.username),
        password: env::var("VIGIL_DB_PASSWORD").unwrap_or(defaults.password),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse().unwrap()))
        .json()
        .init();

    tracing::info!("Starting VIGIL server...");

    let config = db_config_from_env();
    // Connecting also runs pending migrations.
    let _manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(error = %err, "Failed to initialize SurrealDB");
            std::process::exit(1);
        }
    };

    // TODO: expose the engine over a REST API once the surface settles.

    tracing::info!("VIGIL server stopped.");
}
