//! The three pipeline roles. Each asks its model for a JSON object and
//! degrades to a role-specific default when the reply cannot be parsed.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::brain::{Brain, ChatModel};
use crate::error::{ExtractError, Result};
use crate::extract::{ExtractionMode, extract};
use crate::prompts;
use crate::types::{Action, Analysis, ExecutorOutput, PageSnapshot, Plan};

pub const UNABLE_TO_GENERATE: &str = "Unable to generate actions";
pub const ACTIONS_GENERATED: &str = "Actions generated";

/// A model reply, either as the expected record or as raw text.
#[derive(Debug)]
pub enum Reply<T> {
    Parsed(T),
    Unparsed { raw: String, reason: ExtractError },
}

/// Ask once; in strict mode ask a second time with a reminder before
/// giving up on structure.
async fn ask<T: DeserializeOwned>(
    brain: &Brain,
    mode: ExtractionMode,
    prompt: &str,
    context: Option<&Value>,
) -> Result<Reply<T>> {
    let raw = brain.think(prompt, context).await?;
    let reason = match extract::<T>(&raw, mode) {
        Ok(parsed) => return Ok(Reply::Parsed(parsed)),
        Err(reason) => reason,
    };

    if mode == ExtractionMode::Greedy {
        return Ok(Reply::Unparsed { raw, reason });
    }

    debug!(agent = brain.name(), %reason, "retrying with strict JSON reminder");
    let retry = brain
        .think(&prompts::strict_retry(prompt), context)
        .await?;
    Ok(match extract::<T>(&retry, mode) {
        Ok(parsed) => Reply::Parsed(parsed),
        Err(reason) => Reply::Unparsed { raw: retry, reason },
    })
}

pub struct Planner {
    brain: Brain,
    mode: ExtractionMode,
}

impl Planner {
    pub fn new(model: Arc<dyn ChatModel>, mode: ExtractionMode) -> Self {
        Self {
            brain: Brain::new(prompts::PLANNER_NAME, prompts::PLANNER_ROLE, model),
            mode,
        }
    }

    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    /// `context` is the page snapshot plus recent chat, as JSON.
    pub async fn create_plan(&self, task: &str, page: &PageSnapshot, context: &Value) -> Result<Plan> {
        let prompt = prompts::planner_prompt(task, page);
        Ok(match ask::<Plan>(&self.brain, self.mode, &prompt, Some(context)).await? {
            Reply::Parsed(plan) => plan,
            Reply::Unparsed { raw, reason } => {
                warn!(%reason, "planner reply not structured, using fallback plan");
                Plan::fallback(task, &raw)
            }
        })
    }
}

pub struct Analyzer {
    brain: Brain,
    mode: ExtractionMode,
}

impl Analyzer {
    pub fn new(model: Arc<dyn ChatModel>, mode: ExtractionMode) -> Self {
        Self {
            brain: Brain::new(prompts::ANALYZER_NAME, prompts::ANALYZER_ROLE, model),
            mode,
        }
    }

    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    pub async fn analyze_page(&self, page: &PageSnapshot, plan: &Plan) -> Result<Analysis> {
        let prompt = prompts::analyzer_prompt(page, plan);
        let context = serde_json::to_value(page).unwrap_or(Value::Null);
        Ok(match ask::<Analysis>(&self.brain, self.mode, &prompt, Some(&context)).await? {
            Reply::Parsed(analysis) => analysis,
            Reply::Unparsed { raw, reason } => {
                warn!(%reason, "analyzer reply not structured, using fallback analysis");
                Analysis::fallback(&raw)
            }
        })
    }
}

/// Keep every action that fits the [`Action`] shape; drop the others.
fn parse_actions(raw: Vec<Value>) -> Vec<Action> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<Action>(value) {
            Ok(action) => Some(action),
            Err(err) => {
                warn!(error = %err, "skipping malformed action");
                None
            }
        })
        .collect()
}

pub struct Executor {
    brain: Brain,
    mode: ExtractionMode,
}

impl Executor {
    pub fn new(model: Arc<dyn ChatModel>, mode: ExtractionMode) -> Self {
        Self {
            brain: Brain::new(prompts::EXECUTOR_NAME, prompts::EXECUTOR_ROLE, model),
            mode,
        }
    }

    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    /// Actions for the extension plus the model's result text.
    pub async fn generate_actions(
        &self,
        analysis: &Analysis,
        plan: &Plan,
    ) -> Result<(Vec<Action>, String)> {
        let prompt = prompts::executor_prompt(analysis, plan);
        Ok(match ask::<ExecutorOutput>(&self.brain, self.mode, &prompt, None).await? {
            Reply::Parsed(output) => (
                parse_actions(output.actions),
                output
                    .result
                    .unwrap_or_else(|| ACTIONS_GENERATED.to_string()),
            ),
            Reply::Unparsed { reason, .. } => {
                warn!(%reason, "executor reply not structured, no actions");
                (Vec::new(), UNABLE_TO_GENERATE.to_string())
            }
        })
    }
}
