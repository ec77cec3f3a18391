use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::Agent;
use crate::error::AgentError;

/// Runs an external program per question.
///
/// The question is written to the program's stdin and its trimmed stdout is
/// the answer. The program learns where the dataset lives and where to save
/// plots through `TABCHAT_DATASET` and `TABCHAT_PLOT_PATH`; the rendered
/// analyst prompt is passed in `TABCHAT_PROMPT`.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    dataset: PathBuf,
    plot_path: PathBuf,
    prompt: String,
}

impl CommandAgent {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        dataset: impl Into<PathBuf>,
        plot_path: impl Into<PathBuf>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            dataset: dataset.into(),
            plot_path: plot_path.into(),
            prompt: prompt.into(),
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl Agent for CommandAgent {
    fn name(&self) -> &str {
        &self.program
    }

    async fn ask(&self, question: &str) -> Result<String, AgentError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("TABCHAT_DATASET", &self.dataset)
            .env("TABCHAT_PLOT_PATH", &self.plot_path)
            .env("TABCHAT_PROMPT", &self.prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(program = %self.program, "spawning agent process");
        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // Programs that ignore stdin may exit before reading it.
            match stdin.write_all(question.as_bytes()).await {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("agent process exited with {}", output.status)
            } else {
                stderr
            };
            return Err(AgentError::Failed(message));
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(program = %self.program, bytes = answer.len(), "agent process answered");
        Ok(answer)
    }
}
