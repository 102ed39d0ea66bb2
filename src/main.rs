mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod notifier;
mod poller;
mod state;
mod transform;
mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::api::HealthState;
use crate::config::Config;
use crate::error::Result;
use crate::poller::Poller;
use crate::state::DedupStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Dedup store: must be loaded before the first cycle ---
    let pool = db::open(&cfg.db_path).await?;
    let store = DedupStore::load(pool).await?;
    info!("Database ready at {}", cfg.db_path);

    if cfg.contract_address.is_none() && cfg.collection_slug.is_none() {
        warn!("Neither CONTRACT_ADDRESS nor COLLECTION_SLUG set; polling unfiltered {} events", cfg.event_type);
    }
    if cfg.api_key.is_empty() {
        warn!("OPENSEA_API_KEY not set; requests are likely to be rejected");
    }

    let health = Arc::new(HealthState::new());

    // --- Poller ---
    let poller = Arc::new(Poller::new(&cfg, Arc::clone(&store), Arc::clone(&health))?);
    info!(
        interval_secs = cfg.poll_interval_secs,
        event_type = %cfg.event_type,
        "Polling {}/events every {}s",
        cfg.api_url,
        cfg.poll_interval_secs,
    );
    tokio::spawn(async move { poller.run().await });

    // --- HTTP status API ---
    let app = router(ApiState { health, store });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
