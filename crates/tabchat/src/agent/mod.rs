//! Question-answering agents the relay delegates to.
//!
//! An agent receives a natural-language question with an implicit dataset
//! context and returns answer text. It may also write an image to the plot
//! slot as a side effect; the relay never asks the agent about that and
//! inspects the slot instead.

use async_trait::async_trait;

use crate::error::AgentError;

mod command;
mod openai;

pub use command::CommandAgent;
pub use openai::{OpenAiAgent, OpenAiConfig};

#[async_trait]
pub trait Agent: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Answers `question`. No timeout is applied by the caller.
    async fn ask(&self, question: &str) -> Result<String, AgentError>;
}
