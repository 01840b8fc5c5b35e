//! Concierge: a conversational personal assistant for the terminal.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Concierge: chat with an assistant that checks the weather, your calendar and your email")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (interactive, or a single message with -m)
    Chat {
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,

        /// Whose preferences to read and write
        #[arg(short, long, env = "CONCIERGE_USER")]
        user: Option<String>,
    },

    /// List the tools the assistant can call
    Tools,

    /// Check configuration and keys
    Doctor,

    /// Write a starter config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

    // Logs go to stderr so the chat transcript on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message, user } => commands::chat::run(message, user).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Init => commands::init::run().await?,
    }

    Ok(())
}
