use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Any JSON value as text; strings verbatim, everything else as compact JSON.
fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Null => None,
        other => Some(text_of(other)),
    })
}

/// A list of anything, or a single bare value, as texts.
fn lenient_texts<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(lenient_values(de)?.into_iter().map(text_of).collect())
}

/// A list, or a single bare value, with nulls dropped.
fn lenient_values<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
        other => vec![other],
    })
}

/// A DOM element reported by the content script. Only the fields the
/// backend reads are typed; everything else rides along in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn new(tag: &str, text: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

/// Snapshot of the current tab, produced by the browser extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "interactiveElements", default)]
    pub interactive_elements: Vec<Element>,
    #[serde(default)]
    pub forms: Vec<Value>,
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(rename = "pageType", default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageSnapshot {
    /// The content script sets an `error` key when it could not read the page.
    pub fn has_error(&self) -> bool {
        self.extra.contains_key("error")
    }
}

/// One line of the extension's chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Planner output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, deserialize_with = "lenient_text")]
    pub understanding: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub approach: Option<String>,
    #[serde(default, deserialize_with = "lenient_texts")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_texts")]
    pub risks: Vec<String>,
}

impl Plan {
    /// Used when the planner reply carries no usable JSON object.
    pub fn fallback(task: &str, raw: &str) -> Self {
        Self {
            understanding: Some(raw.to_string()),
            approach: Some("Direct execution".to_string()),
            steps: vec![task.to_string()],
            risks: Vec::new(),
        }
    }
}

/// How the analyzer ties a plan step to the page. Models number steps or
/// put non-string values here, so those stay raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMapping {
    #[serde(default)]
    pub step: Option<Value>,
    #[serde(default)]
    pub element: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub selector: Option<String>,
}

/// Analyzer output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub analysis: Option<String>,
    #[serde(default, deserialize_with = "lenient_mappings")]
    pub element_mapping: Vec<ElementMapping>,
}

/// Mappings that do not fit the record shape are skipped one by one.
fn lenient_mappings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<ElementMapping>, D::Error> {
    Ok(lenient_values(de)?
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

impl Analysis {
    pub fn fallback(raw: &str) -> Self {
        Self {
            analysis: Some(raw.to_string()),
            element_mapping: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Type,
    Scroll,
    Navigate,
    Wait,
    Extract,
}

/// A browser action for the extension to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, deserialize_with = "lenient_text")]
    pub selector: Option<String>,
    /// Text to type, URL, scroll offset or wait time; passed through as sent.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

/// Executor output as the model is asked to shape it. Actions stay raw so
/// each one can be validated on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOutput {
    #[serde(default, deserialize_with = "lenient_values")]
    pub actions: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerInsight {
    pub approach: Option<String>,
    pub steps: Vec<String>,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerInsight {
    pub analysis: Option<String>,
    pub elements_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorInsight {
    pub actions_generated: usize,
}

/// Diagnostic side channel of a [`TaskResult`]. The two backends report
/// different shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentInsights {
    Pipeline {
        planner: PlannerInsight,
        analyzer: AnalyzerInsight,
        executor: ExecutorInsight,
    },
    Direct {
        approach: String,
        steps: Vec<String>,
        risks: Vec<String>,
    },
}

/// What a task produces, regardless of backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub understanding: String,
    pub actions: Vec<Action>,
    pub result: String,
    pub agent_insights: AgentInsights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub task: String,
    pub result: TaskResult,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_snapshot_from_extension_payload() {
        let page: PageSnapshot = serde_json::from_value(json!({
            "url": "https://news.example.com",
            "title": "News",
            "text": "Body",
            "interactiveElements": [
                {"type": "h2", "text": "A headline", "className": "title"}
            ],
            "pageType": "article"
        }))
        .unwrap();

        assert_eq!(page.interactive_elements.len(), 1);
        let el = &page.interactive_elements[0];
        assert_eq!(el.tag.as_deref(), Some("h2"));
        assert_eq!(el.extra["className"], "title");
        assert_eq!(page.page_type.as_deref(), Some("article"));
        assert!(!page.has_error());
    }

    #[test]
    fn test_error_key_detected_even_when_null() {
        let page: PageSnapshot =
            serde_json::from_value(json!({"url": "chrome://settings", "error": null})).unwrap();
        assert!(page.has_error());
    }

    #[test]
    fn test_element_keeps_camel_case_key_on_serialize() {
        let page = PageSnapshot {
            interactive_elements: vec![Element::new("button", "Go")],
            ..Default::default()
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["interactiveElements"][0]["type"], "button");
    }

    #[test]
    fn test_action_kind_lowercase() {
        let action: Action = serde_json::from_value(json!({
            "type": "navigate",
            "selector": null,
            "value": "https://example.com"
        }))
        .unwrap();
        assert_eq!(action.kind, ActionKind::Navigate);
        assert!(action.description.is_none());
    }

    #[test]
    fn test_unknown_action_kind_rejected() {
        let parsed = serde_json::from_value::<Action>(json!({"type": "hover"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_insights_serialize_untagged() {
        let direct = AgentInsights::Direct {
            approach: "Error handling".into(),
            steps: vec![],
            risks: vec![],
        };
        let value = serde_json::to_value(&direct).unwrap();
        assert_eq!(value["approach"], "Error handling");
        assert!(value.get("planner").is_none());
    }

    #[test]
    fn test_mapping_keeps_numeric_step_and_value() {
        let analysis: Analysis = serde_json::from_value(json!({
            "analysis": "found the search box",
            "element_mapping": [
                {"step": 1, "selector": "#q", "action": "type", "value": 42},
                "not a mapping"
            ]
        }))
        .unwrap();
        assert_eq!(analysis.element_mapping.len(), 1);
        let mapping = &analysis.element_mapping[0];
        assert_eq!(mapping.step, Some(json!(1)));
        assert_eq!(mapping.value, Some(json!(42)));
        assert_eq!(mapping.selector.as_deref(), Some("#q"));
    }

    #[test]
    fn test_plan_accepts_step_objects() {
        let plan: Plan = serde_json::from_value(json!({
            "understanding": "wants news",
            "steps": [{"step": 1, "do": "scan"}, "read", null],
            "risks": "slow page"
        }))
        .unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert!(plan.steps[0].contains(r#""do":"scan""#));
        assert_eq!(plan.steps[1], "read");
        assert_eq!(plan.risks, vec!["slow page"]);
    }

    #[test]
    fn test_scroll_action_with_numeric_value() {
        let action: Action =
            serde_json::from_value(json!({"type": "scroll", "value": 500})).unwrap();
        assert_eq!(action.kind, ActionKind::Scroll);
        assert_eq!(action.value, Some(json!(500)));
        assert_eq!(serde_json::to_value(&action).unwrap()["value"], 500);
    }

    #[test]
    fn test_plan_fallback_uses_raw_text_and_task() {
        let plan = Plan::fallback("find news", "I think you want news");
        assert_eq!(plan.understanding.as_deref(), Some("I think you want news"));
        assert_eq!(plan.steps, vec!["find news".to_string()]);
        assert!(plan.risks.is_empty());
    }
}
