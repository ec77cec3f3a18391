use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for the chat client
#[derive(Parser, Debug)]
#[clap(
    name = "tabchat",
    about = "Chat with a tabular dataset through the tabchat relay service"
)]
pub struct CliArgs {
    /// The question to ask. If not provided, will enter interactive mode.
    #[arg()]
    pub prompt: Option<String>,

    /// Base URL of the relay service
    #[arg(long, env = "TABCHAT_URL", default_value = "http://127.0.0.1:8000")]
    pub url: String,

    /// Seconds to wait for each relay response
    #[arg(long, default_value_t = 20)]
    pub timeout: u64,

    /// Bearer token for a relay started with an auth key
    #[arg(long, env = "TABCHAT_API_KEY")]
    pub api_key: Option<String>,

    /// Directory where plots are written as they arrive
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,
}

impl CliArgs {
    pub fn plot_dir(&self) -> PathBuf {
        self.plot_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tabchat-plots"))
    }
}
