//! `rentwise chat`: single-message or interactive chat mode.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use rentwise_agent::{ChatEngine, TurnRequest};
use rentwise_config::AppConfig;

pub async fn run(
    session: Option<String>,
    message: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let engine = rentwise_gateway::build_engine(&config)?;

    if !message.is_empty() {
        let turn = engine
            .handle_turn(TurnRequest::new(session.as_deref(), message.join(" ")))
            .await;
        println!("{}", turn.reply);
        eprintln!("  (session {})", turn.session_id);
        return Ok(());
    }

    interactive(&engine, &config, session).await
}

async fn interactive(
    engine: &ChatEngine,
    config: &AppConfig,
    mut session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  rentwise, interactive mode");
    println!();
    println!("  Rental API:  {}", config.rental_api.base_url);
    println!("  Extractor:   {}", engine.extractor_name());
    println!();
    println!("  Describe the home you want, one condition or many per line.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if matches!(line, "exit" | "quit") {
            break;
        }

        let turn = engine
            .handle_turn(TurnRequest::new(session.as_deref(), line))
            .await;
        debug!(session_id = %turn.session_id, outcome = ?turn.outcome, "Turn finished");
        session = Some(turn.session_id.to_string());

        println!();
        for reply_line in turn.reply.lines() {
            println!("  rentwise > {reply_line}");
        }
        println!();
    }

    println!();
    if let Some(id) = session {
        println!("  Session {id} closed.");
    }
    println!();
    Ok(())
}
