use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

mod chat;
mod cli_args;
mod client;
mod commands;
mod logging;
mod session;

use chat::{TurnEnd, ask_once, interactive_loop};
use cli_args::CliArgs;
use client::RelayClient;
use logging::setup_logging;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    setup_logging()?;
    let args = CliArgs::parse();

    let client = RelayClient::new(
        &args.url,
        Duration::from_secs(args.timeout),
        args.api_key.clone(),
    )?;
    let plot_dir = args.plot_dir();

    if let Some(question) = args.prompt.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        return Ok(match ask_once(&client, &plot_dir, question).await {
            TurnEnd::Answered => ExitCode::SUCCESS,
            TurnEnd::Failed | TurnEnd::Interrupted => ExitCode::FAILURE,
        });
    }

    if let Err(e) = client.health().await {
        tracing::warn!(error = %e, "relay health check failed");
    }
    interactive_loop(&client, &plot_dir).await?;
    Ok(ExitCode::SUCCESS)
}
