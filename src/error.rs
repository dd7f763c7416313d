//! Error types for the copilot service.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::Plan;

/// Failure talking to the chat-completion endpoint.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Non-success status from the endpoint
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The reply carried no message content
    #[error("no content in model response: {0}")]
    EmptyResponse(String),
}

/// Why a model reply could not be turned into a structured record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object found in reply")]
    NoObject,

    #[error("reply is JSON but not an object")]
    NotAnObject,

    #[error("invalid JSON: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Steps of the agent pipeline that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Analyzing,
    Executing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Planning => "planning",
            Stage::Analyzing => "analyzing",
            Stage::Executing => "executing",
        };
        f.write_str(name)
    }
}

/// A pipeline run that did not complete. Carries the plan when the
/// planning stage had already finished.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Model {
        stage: Stage,
        #[source]
        source: ModelError,
        partial: Option<Box<Plan>>,
    },

    #[error("{stage} stage timed out after {}s", .after.as_secs())]
    Timeout {
        stage: Stage,
        after: Duration,
        partial: Option<Box<Plan>>,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Model { stage, .. } | PipelineError::Timeout { stage, .. } => *stage,
        }
    }

    pub fn partial_plan(&self) -> Option<&Plan> {
        match self {
            PipelineError::Model { partial, .. } | PipelineError::Timeout { partial, .. } => {
                partial.as_deref()
            }
        }
    }
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_message_names_stage() {
        let err = PipelineError::Model {
            stage: Stage::Analyzing,
            source: ModelError::Api {
                status: 401,
                message: "bad key".into(),
            },
            partial: None,
        };
        assert_eq!(
            err.to_string(),
            "analyzing stage failed: api error (401): bad key"
        );
        assert!(err.partial_plan().is_none());
    }

    #[test]
    fn test_timeout_keeps_partial_plan() {
        let err = PipelineError::Timeout {
            stage: Stage::Executing,
            after: Duration::from_secs(5),
            partial: Some(Box::new(Plan::fallback("t", "raw"))),
        };
        assert_eq!(err.to_string(), "executing stage timed out after 5s");
        assert_eq!(err.stage(), Stage::Executing);
        assert_eq!(err.partial_plan().unwrap().steps, vec!["t".to_string()]);
    }
}
