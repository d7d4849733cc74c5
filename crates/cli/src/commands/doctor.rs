//! `rentwise doctor`: diagnose configuration and backend reachability.

use rentwise_config::AppConfig;
use rentwise_core::{LandmarkLookup, Provider};
use rentwise_listings::HttpRentalClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("rentwise doctor");
    println!("===============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  [ok]   Config file found at {}", config_path.display());
    } else {
        println!("  [warn] No config file, using defaults. Run `rentwise onboard` to create one");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            println!("\n  1 issue found. Fix the configuration and re-run.");
            return Ok(());
        }
    };

    if config.has_user_id() {
        println!("  [ok]   User id configured");
    } else {
        println!("  [warn] No user id; set X_USER_ID or rental_api.user_id to enable house calls");
        issues += 1;
    }

    match rentwise_providers::build_from_config(&config.llm) {
        Ok(Some(provider)) => match provider.health_check().await {
            Ok(true) => println!("  [ok]   Model service reachable ({})", config.llm.model),
            Ok(false) | Err(_) => {
                println!("  [warn] Model service unreachable; extraction falls back to rules");
                issues += 1;
            }
        },
        Ok(None) => println!("  [ok]   No model service configured; rules-only extraction"),
        Err(e) => {
            println!("  [fail] Model provider could not be built: {e}");
            issues += 1;
        }
    }

    match HttpRentalClient::new(&config.rental_api) {
        Ok(client) => match LandmarkLookup::stats(&client).await {
            Ok(_) => println!("  [ok]   Rental API reachable at {}", config.rental_api.base_url),
            Err(e) => {
                println!("  [fail] Rental API at {}: {e}", config.rental_api.base_url);
                issues += 1;
            }
        },
        Err(e) => {
            println!("  [fail] Rental API client could not be built: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
