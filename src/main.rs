mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use waymark::config::WaymarkConfig;

#[derive(Parser)]
#[command(name = "waymark", version, about = "Offline-first trip tracking engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded JSONL trace through the tracking engine
    Replay {
        /// Trace file: one location sample per line
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "replay-trip")]
        trip: String,
        #[arg(long, default_value = "replay-user")]
        user: String,
        /// Simulate an unreachable persistence store; memories land in the
        /// offline queue
        #[arg(long)]
        offline: bool,
    },
    /// Inspect or maintain the offline event queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// Print queued events, oldest first
    Show,
    /// Keep only the most recent N events
    Trim {
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = WaymarkConfig::load()?;

    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Replay {
            input,
            trip,
            user,
            offline,
        } => {
            cli::replay(config, &input, &trip, &user, offline)?;
        }
        Command::Queue { action } => match action {
            QueueAction::Show => cli::queue_show(&config)?,
            QueueAction::Trim { keep } => cli::queue_trim(&config, keep)?,
        },
    }

    Ok(())
}
