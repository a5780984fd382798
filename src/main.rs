// Predix round market - Main Entry Point
// Host ledger + market contract behind a small JSON API

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use predix_market::app_state::{AppState, SharedState};
use predix_market::config::ServiceConfig;
use predix_market::routes::{build_router, ENDPOINTS};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("\n═══════════════════════════════════════════════");
    println!("     🎲 Predix Round Market");
    println!("═══════════════════════════════════════════════\n");

    let state: SharedState = Arc::new(Mutex::new(AppState::new(config.clone())?));

    // Height ticker: one block per interval
    let ticker_state = state.clone();
    let interval_ms = config.block_interval_ms;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.tick().await;
        loop {
            interval.tick().await;
            match ticker_state.lock() {
                Ok(mut app_state) => {
                    if let Err(e) = app_state.tick() {
                        warn!("height not stored: {}", e);
                    }
                }
                Err(_) => {
                    error!("state lock poisoned, stopping height ticker");
                    break;
                }
            }
        }
    });

    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    println!("\n╔════════════════════════════════════════════╗");
    println!("║   🚀 SERVER RUNNING                        ║");
    println!("║   📡 http://{:<31}║", config.bind_addr);
    println!("╚════════════════════════════════════════════╝\n");

    println!("📋 Available Endpoints:");
    for (method, path, description) in ENDPOINTS {
        println!("   {:<5} {:<30} - {}", method, path, description);
    }
    println!("\n⏱️  One block every {} ms, {} blocks per round\n", interval_ms, predix_market::ROUND_LEN);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("💾 Saving state to disk...");
    match state.lock() {
        Ok(mut app_state) => {
            if let Err(e) = app_state.save_to_disk() {
                error!("❌ Failed to save state: {}", e);
            }
        }
        Err(_) => warn!("state lock poisoned, skipping save"),
    }
    println!("👋 Goodbye!\n");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
    }
    println!("\n\n🛑 Shutdown signal received...");
}
