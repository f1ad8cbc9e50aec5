//! `labeler serve` — Run the shared state server.

use labeler_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("🏷️  Labeler State Server");
    println!("   Listening: {}:{}", config.server.host, config.server.port);
    println!("   State file: {}", config.state_path().display());
    println!(
        "   Clients: set LABELER_PERSISTENCE_URL=http://{}:{}/api/state",
        config.server.host, config.server.port
    );

    labeler_gateway::start(config).await?;

    Ok(())
}
