use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a question-answering agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The agent process could not be started or talked to.
    #[error("Agent I/O Error: {0}")]
    Io(#[from] std::io::Error),

    /// The agent ran but reported a failure of its own.
    #[error("Agent Error: {0}")]
    Failed(String),

    #[error("HTTP Error: {0}")]
    Http(String),

    /// The agent answered with something that is not a usable answer.
    #[error("Response Format Error: {message}. Raw response: '{raw_response}'")]
    ResponseFormat {
        message: String,
        raw_response: String,
    },
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Http(err.to_string())
    }
}

/// Errors touching the plot slot on disk.
#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Failed to clear plot artifact {path}: {source}")]
    Clear {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read plot artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Dataset {0} has no header row")]
    Empty(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid agent configuration: {0}")]
    Agent(String),
}
