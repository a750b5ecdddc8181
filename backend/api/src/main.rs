//! Solidarity API entry point.
//!
//! Loads configuration, opens the SQLite pool (running migrations), makes
//! sure the bootstrap administrator exists and serves the REST API.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use solidarity_api::api::{self, AppState};
use solidarity_api::config::Config;
use solidarity_api::{db, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url, config.max_connections).await?;

    if let Some(email) = &config.bootstrap_admin_email {
        users::bootstrap_admin(&pool, email, &config.bootstrap_admin_name).await?;
    }

    let addr = format!("0.0.0.0:{}", config.api_port);
    let app = api::router(Arc::new(AppState { pool, config }));

    info!("API listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
