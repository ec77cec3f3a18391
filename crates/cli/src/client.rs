//! HTTP client for the relay service.
//!
//! Every transport problem maps to one [`RelayError`] variant whose message is
//! shown to the user as the assistant's reply, so the wording must tell the
//! causes apart.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tabchat::protocol::{AskRequest, AskResponse, ErrorBody};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Could not connect to the backend at {url}. Is the relay service running?")]
    Connect { url: String },

    #[error("The backend did not respond within {secs} seconds.")]
    Timeout { secs: f64 },

    #[error("Backend returned HTTP {status}.{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("Backend returned a response that is not valid JSON.")]
    InvalidJson,

    #[error("Request to the backend failed: {0}")]
    Request(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(" {d}")).unwrap_or_default()
}

pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
}

impl RelayClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    fn map_err(&self, err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            RelayError::Timeout {
                secs: self.timeout.as_secs_f64(),
            }
        } else if err.is_connect() {
            RelayError::Connect {
                url: self.base_url.clone(),
            }
        } else {
            RelayError::Request(err.to_string())
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, RelayError> {
        let resp = req.send().await.map_err(|e| self.map_err(e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.bytes().await.unwrap_or_default();
        let detail = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .map(|b| b.error);
        Err(RelayError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    /// Sends one question. Server-reported failures come back as `Ok` with `success: false`.
    pub async fn ask(&self, question: &str) -> Result<AskResponse, RelayError> {
        let req = self.request(reqwest::Method::POST, "/ask").json(&AskRequest {
            question: question.to_string(),
        });
        let resp = self.send(req).await?;
        let body = resp.bytes().await.map_err(|e| self.map_err(e))?;
        serde_json::from_slice(&body).map_err(|_| RelayError::InvalidJson)
    }

    /// Fetches the current plot. `None` means the relay has none to serve.
    pub async fn plot(&self) -> Result<Option<Vec<u8>>, RelayError> {
        let resp = self.send(self.request(reqwest::Method::GET, "/plot")).await?;
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        let body = resp.bytes().await.map_err(|e| self.map_err(e))?;

        if is_json {
            let err: ErrorBody =
                serde_json::from_slice(&body).map_err(|_| RelayError::InvalidJson)?;
            debug!(reason = %err.error, "no plot available");
            return Ok(None);
        }
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(body.to_vec()))
    }

    pub async fn health(&self) -> Result<(), RelayError> {
        self.send(self.request(reqwest::Method::GET, "/health"))
            .await
            .map(|_| ())
    }
}
