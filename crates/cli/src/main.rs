//! rentwise CLI, the main entry point.
//!
//! Commands:
//! - `serve`    Start the HTTP chat gateway
//! - `chat`     Single-message or interactive chat against the engine
//! - `doctor`   Diagnose configuration and backend reachability
//! - `onboard`  Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rentwise",
    about = "rentwise: conversational rental search assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat from the terminal
    Chat {
        /// Reuse an existing session id
        #[arg(short, long)]
        session: Option<String>,

        /// Send a single message instead of entering interactive mode
        message: Vec<String>,
    },

    /// Diagnose configuration and backend reachability
    Doctor,

    /// Write a default configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { session, message } => commands::chat::run(session, message).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
