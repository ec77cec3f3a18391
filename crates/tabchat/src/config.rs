//! TOML configuration for the relay's agent.
//!
//! ```toml
//! [agent]
//! kind = "command"
//! program = "python3"
//! args = ["agent.py"]
//! ```
//!
//! Without a file the `openai` agent is used with Groq defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::agent::{Agent, CommandAgent, OpenAiAgent, OpenAiConfig};
use crate::dataset::Dataset;
use crate::error::ConfigError;
use crate::prompt::system_prompt;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AgentConfig {
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
    },
    #[serde(rename = "openai")]
    OpenAi(OpenAiConfig),
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::OpenAi(OpenAiConfig::default())
    }
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl AgentConfig {
    /// Builds the configured agent for `dataset`, telling it to save plots at `plot_path`.
    pub fn build(&self, dataset: &Dataset, plot_path: &Path) -> Result<Arc<dyn Agent>, ConfigError> {
        let prompt = system_prompt(dataset, plot_path);
        match self {
            AgentConfig::Command {
                program,
                args,
                working_dir,
            } => {
                if program.trim().is_empty() {
                    return Err(ConfigError::Agent("command agent needs a program".to_string()));
                }
                let mut agent = CommandAgent::new(
                    program.clone(),
                    args.clone(),
                    dataset.path(),
                    plot_path,
                    prompt,
                );
                if let Some(dir) = working_dir {
                    agent = agent.working_dir(dir);
                }
                Ok(Arc::new(agent))
            }
            AgentConfig::OpenAi(cfg) => {
                let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
                    ConfigError::Agent(format!(
                        "environment variable {} is not set",
                        cfg.api_key_env
                    ))
                })?;
                Ok(Arc::new(OpenAiAgent::new(cfg.clone(), api_key, prompt)))
            }
        }
    }
}
