//! Callback Simulator - CLI entry point
//!
//! Fires the callbacks of a configuration file once for a synthesized served
//! event. Useful for smoke-testing callback definitions outside the host
//! stubbing server.

use anyhow::Result;
use callback_simulator::{CallbackConfig, CallbackSimulator, ServedEvent};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "callback-simulator",
    about = "Fire stub callback definitions once against a synthesized served event",
    version
)]
struct Args {
    /// Path to the callbacks configuration file
    #[arg(short, long, default_value = "callbacks.yaml")]
    config: PathBuf,

    /// Request URL of the synthesized served event
    #[arg(short, long, default_value = "/")]
    url: String,

    /// File containing the served request body
    #[arg(long)]
    request_body: Option<PathBuf>,

    /// File containing the served response body
    #[arg(long)]
    response_body: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(path = ?args.config, "Loading callback configuration");
    let config = CallbackConfig::from_file(&args.config)?;

    if args.validate {
        config.validate()?;
        println!(
            "Configuration is valid ({} callbacks defined)",
            config.callbacks.len()
        );
        return Ok(());
    }

    let event = ServedEvent {
        url: args.url,
        request_body: read_optional(args.request_body.as_deref())?,
        response_body: read_optional(args.response_body.as_deref())?,
    };

    let simulator = CallbackSimulator::new();
    let scheduled = simulator.apply(&event, &config);
    info!(scheduled, "Callbacks scheduled");

    // Scheduled tasks are detached and would be abandoned on exit; wait out
    // the longest delay plus the dispatcher's request timeout.
    let max_delay = config.callbacks.iter().map(|c| c.delay_ms).max().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(max_delay) + Duration::from_secs(6)).await;

    Ok(())
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    path.map(std::fs::read_to_string)
        .transpose()
        .map_err(Into::into)
}
