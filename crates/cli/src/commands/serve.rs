//! `gitscribe serve` — Start the HTTP gateway.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("gitscribe gateway");
    println!("   Listening:  http://{}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Repository: {} ({})",
        config.repository.name.as_deref().unwrap_or("<not configured>"),
        config.repository.branch
    );

    gitscribe_gateway::start(config).await?;

    Ok(())
}
