use anyhow::{Context, Result};
use boardsync_core::telemetry;
use boardsync_core::{SyncConfig, ViewController};
use clap::Parser;

mod cli;
mod render;

#[derive(Parser)]
#[command(author, version, about = "Terminal client for the threaded board")]
struct Args {
    /// Base URL of the board API, e.g. http://127.0.0.1:8080/api
    #[arg(long, env = "BOARDSYNC_API_URL")]
    api_url: Option<String>,
    /// Milliseconds between generation status checks
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    let mut config = SyncConfig::from_env();
    if let Some(api_url) = args.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(ms) = args.poll_interval_ms.filter(|ms| *ms > 0) {
        config.poll_interval_ms = ms;
    }
    tracing::info!(api_url = %config.api_url, "starting board client");

    let (controller, events) = ViewController::connect(&config)
        .with_context(|| format!("failed to set up client for {}", config.api_url))?;
    let printer = tokio::spawn(render::print_events(events));

    let result = cli::run_cli(controller).await;
    printer.abort();
    result
}
