use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tabchat::{
    Dataset, PlotSlot, Relay,
    config::RelayConfig,
    plot::DEFAULT_PLOT_FILE,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod routes;
mod shutdown;

use routes::{ServerState, router};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind the service to
    #[arg(long, env = "TABCHAT_ADDR", default_value = "127.0.0.1:8000")]
    addr: String,
    /// CSV dataset the agent answers questions about
    #[arg(long, env = "TABCHAT_DATASET", default_value = "data/titanic_cleaned.csv")]
    dataset: PathBuf,
    /// File the agent saves plots to
    #[arg(long, env = "TABCHAT_PLOT_PATH", default_value = DEFAULT_PLOT_FILE)]
    plot_path: PathBuf,
    /// Path to the agent config file (TOML)
    #[arg(long, env = "TABCHAT_CONFIG")]
    config: Option<PathBuf>,
    /// Optional auth key required for requests (Bearer token)
    #[arg(long, env = "TABCHAT_AUTH_KEY")]
    auth_key: Option<String>,
    /// Browser origin allowed to call the service; `*` mirrors any origin
    #[arg(long = "allow-origin", default_value = "*")]
    allow_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tabchat_service=info,tabchat=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    let dataset = Dataset::load(&args.dataset)?;
    let agent = config
        .agent
        .build(&dataset, &args.plot_path)
        .context("failed to set up agent")?;

    info!(
        addr = %args.addr,
        dataset = %dataset.path().display(),
        rows = dataset.row_count(),
        agent = %agent.name(),
        plot_path = %args.plot_path.display(),
        auth = %args.auth_key.as_ref().map(|_| "enabled").unwrap_or("disabled"),
        "starting service"
    );

    let state = ServerState {
        relay: Arc::new(Relay::new(agent, PlotSlot::new(args.plot_path))),
        auth_key: args.auth_key,
    };
    let app = router(state, &args.allow_origins);

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    info!("service stopped");
    Ok(())
}
