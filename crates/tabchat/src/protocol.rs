//! JSON bodies exchanged between the relay service and its clients.

use serde::{Deserialize, Serialize};

/// Body of the structured "not available" reply from `GET /plot`.
pub const PLOT_UNAVAILABLE: &str = "No plot generated yet.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set only on success: whether this very call produced the plot artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_plot: Option<bool>,
}

impl AskResponse {
    pub fn answered(answer: impl Into<String>, has_plot: bool) -> Self {
        Self {
            success: true,
            answer: Some(answer.into()),
            error: None,
            has_plot: Some(has_plot),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: None,
            error: Some(error.into()),
            has_plot: None,
        }
    }

    pub fn has_plot(&self) -> bool {
        self.success && self.has_plot.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
