use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use super::Agent;
use crate::error::AgentError;

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

/// Settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OpenAiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Answers questions through a hosted chat model.
///
/// The model only sees the dataset summary in its system prompt and cannot
/// execute code, so this agent never produces plots.
pub struct OpenAiAgent {
    client: reqwest::Client,
    config: OpenAiConfig,
    api_key: String,
    system_prompt: String,
}

impl OpenAiAgent {
    pub fn new(config: OpenAiConfig, api_key: String, system_prompt: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key,
            system_prompt,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Agent for OpenAiAgent {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn ask(&self, question: &str) -> Result<String, AgentError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": question },
            ],
        });

        debug!(model = %self.config.model, "sending chat completion request");
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            error!(model = %self.config.model, %status, "chat completion failed");
            return Err(AgentError::Http(format!("{status}: {text}")));
        }

        extract_answer(&text)
    }
}

fn extract_answer(raw: &str) -> Result<String, AgentError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| AgentError::ResponseFormat {
        message: e.to_string(),
        raw_response: raw.to_string(),
    })?;

    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AgentError::ResponseFormat {
            message: "missing choices[0].message.content".to_string(),
            raw_response: raw.to_string(),
        })
}
