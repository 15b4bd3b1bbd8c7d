//! RAEE donation backend: entry point.
//!
//! Opens the SQLite pool, applies migrations, loads the reward table from
//! the catalog and serves the Axum REST API for donors, technicians and
//! institutions.

mod api;
mod auth;
mod config;
mod db;
mod directory;
mod donations;
mod errors;
mod models;
mod validate;


use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ApiState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    if let (Some(dni), Some(password)) = (&config.admin_dni, &config.admin_password) {
        let hash = auth::hash_password(password)?;
        if db::ensure_admin(&pool, dni, &hash).await? {
            info!("Bootstrap admin account created");
        }
    }

    let rewards = db::load_reward_rule(&pool).await?;

    let addr = format!("0.0.0.0:{}", config.api_port);
    let state = Arc::new(ApiState {
        pool,
        config,
        rewards,
    });
    let app = api::router(state);

    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
