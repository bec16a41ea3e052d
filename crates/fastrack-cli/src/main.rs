use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
#[cfg(feature = "notifications")]
mod notifier;

#[derive(Parser)]
#[command(name = "fastrack-cli", version, about = "Fastrack CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fasting timer control
    Fast {
        #[command(subcommand)]
        action: commands::fast::FastAction,
    },
    /// Finished fasts, most recent first
    History {
        /// Number of fasts to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Fasting statistics
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable JSON.
fn init_logging() {
    let filter = EnvFilter::try_from_env("FASTRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Fast { action } => commands::fast::run(action).await,
        Commands::History { limit } => commands::history::run_history(limit),
        Commands::Stats => commands::history::run_stats(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
