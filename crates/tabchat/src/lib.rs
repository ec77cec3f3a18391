//! Core of the tabchat relay: forwards questions about a tabular dataset to an
//! agent and tracks whether each answer came with a freshly drawn plot.

pub mod agent;
pub mod config;
pub mod dataset;
pub mod error;
pub mod plot;
pub mod prompt;
pub mod protocol;
pub mod relay;

pub use agent::Agent;
pub use dataset::Dataset;
pub use plot::{PlotImage, PlotSlot};
pub use protocol::{AskRequest, AskResponse};
pub use relay::Relay;
