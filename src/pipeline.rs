//! Planner → Analyzer → Executor, then content-delivery post-processing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::agents::{Analyzer, Executor, Planner};
use crate::brain::{AgentMessage, ChatModel};
use crate::error::{ModelError, PipelineError, Stage};
use crate::extract::ExtractionMode;
use crate::policy::DeliveryPolicy;
use crate::types::{
    AgentInsights, AnalyzerInsight, ChatMessage, ExecutorInsight, PageSnapshot, Plan,
    PlannerInsight, TaskResult,
};

pub const DEFAULT_UNDERSTANDING: &str =
    "Processing your request to extract relevant information...";
/// Recent chat messages handed to the planner.
pub const CHAT_HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub mode: ExtractionMode,
    /// Upper bound for each stage's model call(s). `None` waits forever.
    pub stage_timeout: Option<Duration>,
}

pub struct AgentPipeline {
    planner: Planner,
    analyzer: Analyzer,
    executor: Executor,
    policy: Arc<DeliveryPolicy>,
    stage_timeout: Option<Duration>,
}

/// Page snapshot as JSON, with the tail of the chat attached.
pub fn planner_context(page: &PageSnapshot, chat_history: &[ChatMessage]) -> Value {
    let mut context = serde_json::to_value(page).unwrap_or_else(|_| json!({}));
    if !chat_history.is_empty() {
        let start = chat_history.len().saturating_sub(CHAT_HISTORY_WINDOW);
        context["chat_history"] = json!(&chat_history[start..]);
    }
    context
}

impl AgentPipeline {
    pub fn new(
        model: Arc<dyn ChatModel>,
        policy: Arc<DeliveryPolicy>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            planner: Planner::new(model.clone(), options.mode),
            analyzer: Analyzer::new(model.clone(), options.mode),
            executor: Executor::new(model, options.mode),
            policy,
            stage_timeout: options.stage_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        stage: Stage,
        plan: Option<&Plan>,
        call: impl Future<Output = Result<T, ModelError>>,
    ) -> Result<T, PipelineError> {
        let partial = || plan.cloned().map(Box::new);
        let outcome = match self.stage_timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(PipelineError::Timeout {
                        stage,
                        after,
                        partial: partial(),
                    });
                }
            },
            None => call.await,
        };
        outcome.map_err(|source| PipelineError::Model {
            stage,
            source,
            partial: partial(),
        })
    }

    /// Run one task end to end. A failed stage aborts the run; the error
    /// keeps the plan if planning had finished.
    #[instrument(skip_all, fields(task = %task))]
    pub async fn process_task(
        &self,
        task: &str,
        page: &PageSnapshot,
        chat_history: &[ChatMessage],
    ) -> Result<TaskResult, PipelineError> {
        let context = planner_context(page, chat_history);

        info!("[Planner] creating plan");
        let plan = self
            .bounded(
                Stage::Planning,
                None,
                self.planner.create_plan(task, page, &context),
            )
            .await?;

        info!(steps = plan.steps.len(), "[Analyzer] analyzing page");
        let analysis = self
            .bounded(
                Stage::Analyzing,
                Some(&plan),
                self.analyzer.analyze_page(page, &plan),
            )
            .await?;

        info!(
            mapped = analysis.element_mapping.len(),
            "[Executor] generating actions"
        );
        let (actions, message) = self
            .bounded(
                Stage::Executing,
                Some(&plan),
                self.executor.generate_actions(&analysis, &plan),
            )
            .await?;

        let result = self.policy.deliver(&message, task, page);
        let insights = AgentInsights::Pipeline {
            planner: PlannerInsight {
                approach: plan.approach.clone(),
                steps: plan.steps.clone(),
                risks: plan.risks.clone(),
            },
            analyzer: AnalyzerInsight {
                analysis: analysis.analysis.clone(),
                elements_found: analysis.element_mapping.len(),
            },
            executor: ExecutorInsight {
                actions_generated: actions.len(),
            },
        };

        Ok(TaskResult {
            understanding: plan
                .understanding
                .unwrap_or_else(|| DEFAULT_UNDERSTANDING.to_string()),
            actions,
            result,
            agent_insights: insights,
        })
    }

    /// Transcripts of the three roles, in pipeline order.
    pub fn transcripts(&self) -> Vec<AgentMessage> {
        let mut all = self.planner.brain().memory();
        all.extend(self.analyzer.brain().memory());
        all.extend(self.executor.brain().memory());
        all
    }

    pub fn clear_memory(&self) {
        self.planner.brain().clear_memory();
        self.analyzer.brain().clear_memory();
        self.executor.brain().clear_memory();
    }
}
