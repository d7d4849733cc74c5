//! `rentwise serve`: start the HTTP chat gateway.

use rentwise_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("rentwise gateway");
    println!("   Listening:    {}:{}", config.gateway.host, config.gateway.port);
    println!("   Rental API:   {}", config.rental_api.base_url);
    println!(
        "   Extraction:   {}",
        if config.llm.is_configured() { "model + rules" } else { "rules only" }
    );

    rentwise_gateway::start(config).await?;

    Ok(())
}
