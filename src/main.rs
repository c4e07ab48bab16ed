//! Binary entrypoint: load configuration, wire up the connection layer's
//! components, and run until interrupted.

use std::sync::Arc;

use clap::Parser;
use streamgate::config::Settings;
use streamgate::governor::{MemoryThresholds, ResourceGovernor};
use streamgate::session::SessionManager;
use streamgate::supervisor::FlowSupervisor;
use streamgate::venue::VenueConnector;
use streamgate::wsmgr::WebSocketManager;
use tracing::{error, info};

/// Multi-venue market-data connection layer.
#[derive(Parser, Debug)]
#[command(name = "streamgate", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, default_value = "streamgate.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)?;
    settings.logging.init();

    info!(venues = settings.venue.len(), "starting streamgate");

    let session_manager = SessionManager::new(settings.session.clone());
    let wsmgr = WebSocketManager::new(session_manager.clone());

    let supervisor = FlowSupervisor::new(wsmgr.clone());
    wsmgr.set_listener(supervisor.clone());

    let governor = ResourceGovernor::new(MemoryThresholds::from(&settings.governor));

    let mut connectors = Vec::new();
    for venue_config in &settings.venue {
        let connector = VenueConnector::new(venue_config.clone(), session_manager.clone(), wsmgr.clone());
        if let Err(err) = connector.initialize().await {
            error!(venue = %venue_config.name, error = %err, "venue initialization failed");
        }
        connectors.push(connector);
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, closing connections");

    for connector in &connectors {
        connector.close_websocket().await;
    }
    wsmgr.close_all().await;
    session_manager.close_all();
    supervisor.close();
    governor.close();

    Ok(())
}
