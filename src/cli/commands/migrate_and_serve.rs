use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

use super::initdb::connect_and_migrate;
use super::serve::run_server;
use crate::config::Settings;
use crate::router::create_router;
use crate::schemas::AppState;

pub async fn migrate_and_serve(database_url: &str, bind_address: &str) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", database_url);
    debug!("Bind address: {}", bind_address);

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return Err(e);
        }
    };

    // The migrated connection becomes the server's pool
    let db = connect_and_migrate(database_url).await?;
    let state = AppState {
        db,
        throttle: settings.login_throttle(),
        settings: Arc::new(settings),
    };
    debug!("Application state initialized successfully");

    run_server(create_router(state), bind_address).await
}
