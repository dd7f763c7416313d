//! Free-text reasoning prompts over the reasoning model. No actions, no
//! structured output.
//!
//! Only [`ReasoningChains::analyze_problem`] is served over HTTP
//! (`/api/analyze`); the other chains are library API with no route yet.

use std::sync::Arc;

use serde_json::Value;

use crate::brain::ChatModel;
use crate::error::Result;
use crate::prompts;

pub struct ReasoningChains {
    model: Arc<dyn ChatModel>,
}

impl ReasoningChains {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn analyze_problem(&self, problem: &str, context: &Value) -> Result<String> {
        self.model
            .complete(&prompts::problem_analysis_prompt(problem, context))
            .await
    }

    pub async fn select_element(&self, task: &str, elements: &Value) -> Result<String> {
        self.model
            .complete(&prompts::element_selection_prompt(task, elements))
            .await
    }

    pub async fn validate_action(&self, action: &Value, context: &Value) -> Result<String> {
        self.model
            .complete(&prompts::action_validation_prompt(action, context))
            .await
    }

    pub async fn understand_context(&self, page: &Value) -> Result<String> {
        self.model
            .complete(&prompts::context_understanding_prompt(page))
            .await
    }
}
