//! Model-free backend: answers from the page snapshot by keyword.

use crate::dom::{extract_headlines, extract_summary};
use crate::types::{AgentInsights, PageSnapshot, TaskResult};

pub const HEADLINE_KEYWORDS: [&str; 4] = ["headline", "news", "top story", "breaking"];
pub const SUMMARY_KEYWORDS: [&str; 3] = ["summar", "about", "what is"];

const RESTRICTED_PREFIX: &str = "Page content could not be retrieved";
const RESTRICTED_UNDERSTANDING: &str = "The content script could not access the page. This often happens on restricted pages like Chrome settings or extension pages.";
const RESTRICTED_RESULT: &str = "I cannot access the content of this page. This typically happens on restricted pages like Chrome settings or extension pages. Try using the agent on a regular website.";
const GENERIC_RESULT: &str = "I can help you with this page. Try asking for headlines or a summary.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Headlines,
    Summary,
    Other,
}

pub fn classify(task: &str) -> TaskKind {
    let lower = task.to_lowercase();
    if HEADLINE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        TaskKind::Headlines
    } else if SUMMARY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        TaskKind::Summary
    } else {
        TaskKind::Other
    }
}

fn direct(approach: &str, steps: &[&str], risks: &[&str]) -> AgentInsights {
    AgentInsights::Direct {
        approach: approach.to_string(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
        risks: risks.iter().map(|s| s.to_string()).collect(),
    }
}

fn access_error(page: &PageSnapshot) -> TaskResult {
    let detail = if page.text.is_empty() {
        "Could not retrieve page content"
    } else {
        page.text.as_str()
    };
    TaskResult {
        understanding: RESTRICTED_UNDERSTANDING.to_string(),
        actions: Vec::new(),
        result: format!(
            "Content Access Error: {detail}. Try using the agent on a regular website instead of restricted Chrome pages."
        ),
        agent_insights: direct(
            "Error handling",
            &["Identify content access issue", "Provide helpful error message"],
            &["Content script unavailable on restricted pages"],
        ),
    }
}

/// Answer `task` from `page` alone. Never fails.
pub fn process(task: &str, page: &PageSnapshot) -> TaskResult {
    if page.has_error() {
        return access_error(page);
    }

    let (understanding, result) = match classify(task) {
        TaskKind::Headlines => (
            "User wants to see the top headlines from this page",
            extract_headlines(page),
        ),
        TaskKind::Summary => ("User wants a summary of this page", extract_summary(page)),
        TaskKind::Other if page.text.starts_with(RESTRICTED_PREFIX) => (
            "User is on a restricted page where content access is limited",
            RESTRICTED_RESULT.to_string(),
        ),
        TaskKind::Other => (
            "User has a general question about the page",
            GENERIC_RESULT.to_string(),
        ),
    };

    TaskResult {
        understanding: understanding.to_string(),
        actions: Vec::new(),
        result,
        agent_insights: direct(
            "Direct content extraction",
            &["Analyze page data", "Extract relevant content", "Format for user"],
            &[],
        ),
    }
}
