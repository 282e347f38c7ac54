//! `mindmate gateway`: Start the HTTP API server.

use mindmate_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("MindMate Gateway");
    println!("   Listening:      {}:{}", config.gateway.host, config.gateway.port);
    println!("   Knowledge base: {}", config.knowledge_base.display());
    println!("   Max sessions:   {}", config.gateway.max_sessions);

    mindmate_gateway::start(config).await?;

    Ok(())
}
