//! Tilt Control - terminal client for the Tilt reply engine
//!
//! Chats on stdin, answers one-shot questions, and runs the auto-feed demo.

mod commands;
mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tilt_shared::{Scheduler, Style, TiltConfig};
use tracing_subscriber::EnvFilter;

// Version is embedded at build time
const VERSION: &str = env!("TILT_VERSION");

/// Log filter override
const LOG_ENV: &str = "TILT_LOG";

#[derive(Parser)]
#[command(name = "tiltctl")]
#[command(about = "Tilt - a calm voice for tilted traders", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Config file (defaults to $TILT_CONFIG or ~/.config/tilt/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding prompts.json and inputs.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Reply voice: blunt, coach or deadpan
    #[arg(long, global = true)]
    style: Option<Style>,

    /// Verbose logging to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,

    /// Get a single reply
    Ask {
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,

        /// Print immediately, skipping the thinking delay
        #[arg(long)]
        no_delay: bool,
    },

    /// Replay sample inputs on a timer
    Feed {
        /// Number of inputs to feed
        #[arg(long, default_value_t = 5)]
        count: usize,

        /// Interval between inputs in milliseconds
        #[arg(long, default_value_t = 3_000)]
        every_ms: u64,
    },

    /// List the sample inputs
    Samples,

    /// Write the default config
    InitConfig {
        /// Target path (defaults to the user config dir)
        path: Option<PathBuf>,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<TiltConfig> {
    let mut config = match &cli.config {
        Some(path) => TiltConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TiltConfig::load(),
    };
    if let Some(dir) = &cli.data_dir {
        config.engine.data_dir = dir.clone();
    }
    if let Some(style) = cli.style {
        config.engine.style = style;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    init_logging(cli.debug);

    let command = cli.command.take().unwrap_or(Commands::Chat);
    if let Commands::InitConfig { path } = &command {
        return commands::init_config(path.clone());
    }

    let config = load_config(&cli)?;
    let mut engine = commands::prepare_engine(&config).await;
    let scheduler = Scheduler::new(&config.scheduler);

    let result = match command {
        Commands::Chat => commands::chat(&mut engine, &scheduler, &config.pacing, cli.debug).await,
        Commands::Ask { text, no_delay } => {
            commands::ask(&mut engine, &scheduler, &config.pacing, &text, no_delay, cli.debug)
                .await
        }
        Commands::Feed { count, every_ms } => {
            commands::feed(&mut engine, &scheduler, &config.pacing, count, every_ms, cli.debug)
                .await
        }
        Commands::Samples => commands::samples(&engine),
        Commands::InitConfig { .. } => Ok(()),
    };

    scheduler.destroy();
    result
}
