use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod content;
mod platform;

#[derive(Parser)]
#[command(name = "carenudge-cli", version, about = "carenudge CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scheduler lifecycle and maintenance
    Service {
        #[command(subcommand)]
        action: commands::service::ServiceAction,
    },
    /// Schedule, show, and respond to nudges
    Nudge {
        #[command(subcommand)]
        action: commands::nudge::NudgeCmd,
    },
    /// Notification identifier management
    Ids {
        #[command(subcommand)]
        action: commands::ids::IdsAction,
    },
    /// Background task simulation
    Background {
        #[command(subcommand)]
        action: commands::background::BackgroundAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Service { action } => commands::service::run(action).await,
        Commands::Nudge { action } => commands::nudge::run(action).await,
        Commands::Ids { action } => commands::ids::run(action).await,
        Commands::Background { action } => commands::background::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
