use std::sync::Arc;

use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::error::SlotError;
use crate::plot::{PlotImage, PlotSlot};
use crate::protocol::AskResponse;

/// Forwards questions to an agent and reports whether each call produced a plot.
///
/// A relay owns no per-request state. Its only shared resource is the plot
/// slot, which it expects to be driven by one `ask` at a time.
pub struct Relay {
    agent: Arc<dyn Agent>,
    slot: PlotSlot,
}

impl Relay {
    pub fn new(agent: Arc<dyn Agent>, slot: PlotSlot) -> Self {
        Self { agent, slot }
    }

    /// Answers `question`, never failing: every error becomes a `success: false` reply.
    pub async fn ask(&self, question: &str) -> AskResponse {
        let question = question.trim();
        if question.is_empty() {
            return AskResponse::failed("Question must not be empty.");
        }

        let cleared = match self.slot.clear().await {
            Ok(cleared) => cleared,
            Err(e) => {
                error!(error = %e, "refusing to run agent against an uncleared plot slot");
                return AskResponse::failed(e.to_string());
            }
        };

        info!(agent = %self.agent.name(), "asking agent");
        match self.agent.ask(question).await {
            Ok(answer) => {
                let has_plot = cleared.produced().await;
                info!(has_plot, "agent answered");
                AskResponse::answered(answer, has_plot)
            }
            Err(e) => {
                warn!(error = %e, "agent failed");
                AskResponse::failed(e.to_string())
            }
        }
    }

    /// The current plot artifact, if any. Last write wins.
    pub async fn plot(&self) -> Result<Option<PlotImage>, SlotError> {
        self.slot.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Writes a plot for questions mentioning "plot" and fails on "fail".
    struct ScriptedAgent {
        plot_path: PathBuf,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn ask(&self, question: &str) -> Result<String, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if question.contains("fail") {
                return Err(AgentError::Failed("no such column".to_string()));
            }
            if question.contains("plot") {
                tokio::fs::write(&self.plot_path, b"\x89PNG fresh").await?;
                return Ok("Here is the histogram.".to_string());
            }
            Ok("29.7".to_string())
        }
    }

    fn plot_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("output.png")
    }

    fn relay(dir: &tempfile::TempDir) -> (Relay, Arc<ScriptedAgent>) {
        let path = plot_path(dir);
        let agent = Arc::new(ScriptedAgent {
            plot_path: path.clone(),
            calls: AtomicUsize::new(0),
        });
        (Relay::new(agent.clone(), PlotSlot::new(path)), agent)
    }

    #[tokio::test]
    async fn freshness_follows_the_latest_call() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, _) = relay(&dir);

        let first = relay.ask("average age?").await;
        assert_eq!(first, AskResponse::answered("29.7", false));

        let second = relay.ask("plot the age histogram").await;
        assert_eq!(second, AskResponse::answered("Here is the histogram.", true));

        let third = relay.ask("average fare?").await;
        assert_eq!(third, AskResponse::answered("29.7", false));
        assert_eq!(relay.plot().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_artifact_from_before_start_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, _) = relay(&dir);
        std::fs::write(plot_path(&dir), b"stale").unwrap();

        let resp = relay.ask("average age?").await;
        assert!(!resp.has_plot());
        assert!(!plot_path(&dir).exists());
    }

    #[tokio::test]
    async fn plot_before_any_ask_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, _) = relay(&dir);
        assert_eq!(relay.plot().await.unwrap(), None);
    }

    #[tokio::test]
    async fn plot_serves_fresh_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, _) = relay(&dir);
        relay.ask("plot survival by class").await;

        let image = relay.plot().await.unwrap().unwrap();
        assert_eq!(image.bytes, b"\x89PNG fresh");
        assert_eq!(image.media_type, "image/png");
    }

    #[tokio::test]
    async fn agent_failure_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, _) = relay(&dir);

        let resp = relay.ask("fail on purpose").await;
        assert!(!resp.success);
        assert_eq!(resp.answer, None);
        assert_eq!(resp.has_plot, None);
        assert_eq!(resp.error.as_deref(), Some("Agent Error: no such column"));
    }

    #[tokio::test]
    async fn agent_failure_still_clears_previous_plot() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, _) = relay(&dir);
        relay.ask("plot fares").await;

        relay.ask("fail now").await;
        assert_eq!(relay.plot().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_question_skips_agent() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, agent) = relay(&dir);

        let resp = relay.ask("   ").await;
        assert_eq!(resp, AskResponse::failed("Question must not be empty."));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn uncleared_slot_skips_agent() {
        let dir = tempfile::tempdir().unwrap();
        let (relay, agent) = relay(&dir);
        // A directory in the slot's place cannot be removed as a file.
        std::fs::create_dir(plot_path(&dir)).unwrap();

        let resp = relay.ask("plot ages").await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("Failed to clear plot artifact"));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }
}
