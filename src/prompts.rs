//! Prompt templates for the agent roles and reasoning chains.

use serde_json::Value;

use crate::dom::truncate_chars;
use crate::types::{Analysis, PageSnapshot, Plan};

pub const PLANNER_NAME: &str = "Planner";
pub const PLANNER_ROLE: &str = "strategic planner who breaks down complex tasks into actionable steps with a focus on delivering actual content and information to users rather than just describing actions";

pub const ANALYZER_NAME: &str = "Analyzer";
pub const ANALYZER_ROLE: &str = "expert at analyzing webpages and identifying the best elements to interact with, with a focus on extracting actual content and information for users rather than just describing UI elements";

pub const EXECUTOR_NAME: &str = "Executor";
pub const EXECUTOR_ROLE: &str = "precise task executor who generates executable actions with a focus on extracting and delivering actual content and information to users rather than just performing mechanical actions";

/// Appended on the one retry allowed in strict extraction mode.
pub const STRICT_JSON_REMINDER: &str = "IMPORTANT: Your previous reply could not be parsed. Respond with ONLY the JSON object described above. No markdown, no explanation, no text before or after it.";

/// Page text shown to the analyzer.
pub const ANALYZER_TEXT_CHARS: usize = 500;
/// Interactive elements shown to the analyzer.
pub const ANALYZER_MAX_ELEMENTS: usize = 10;

const PLANNER_INSTRUCTIONS: &str = r#"Create a strategic plan that prioritizes CONTENT EXTRACTION AND DELIVERY over procedural descriptions.

When the task asks for information (news, content, summaries, etc.):
1. Focus on identifying and extracting ACTUAL CONTENT from the page
2. Plan how to gather and synthesize the requested information
3. Think about how to present the information in a useful way

Steps for content-focused planning:
1. Content Identification: What specific information is available?
2. Extraction Strategy: How to gather that information?
3. Synthesis Approach: How to organize and present it?
4. Delivery Method: How to communicate it clearly to the user?

Respond in JSON format:
{
  "understanding": "...",
  "approach": "...",
  "steps": ["step1", "step2", ...],
  "risks": ["risk1", "risk2", ...]
}

EXAMPLE GOOD RESPONSE FOR "WHAT ARE THE TOP NEWS HEADLINES":
{
  "understanding": "User wants actual news headlines from the current page",
  "approach": "Extract headlines from visible news elements and present them as a numbered list",
  "steps": [
    "Identify headline elements (h1, h2, h3 tags)",
    "Extract text content from those elements",
    "Format as a clear numbered list of headlines",
    "Present to user without procedural descriptions"
  ],
  "risks": [
    "Headlines may not be clearly marked",
    "May need to filter out non-news content"
  ]
}"#;

const ANALYZER_INSTRUCTIONS: &str = r#"For each step, identify:
1. Which element(s) to interact with
2. What action to take (click, type, scroll, etc.)
3. What value to use (if typing)
4. CSS selector for the element

Respond in JSON format:
{
  "analysis": "...",
  "element_mapping": [
    {
      "step": "...",
      "element": {...},
      "action": "click|type|scroll",
      "value": "...",
      "selector": "..."
    }
  ]
}"#;

const EXECUTOR_INSTRUCTIONS: &str = r#"YOUR PRIMARY GOAL: EXTRACT AND FORMAT REAL CONTENT FROM THE PAGE DATA PROVIDED.

Format for actions:
{
  "actions": [
    {
      "type": "click|type|scroll|navigate|wait|extract",
      "selector": "CSS selector",
      "value": "value for type actions",
      "description": "what this does"
    }
  ],
  "result": "FORMAT AND RETURN THE ACTUAL CONTENT IDENTIFIED IN THE PLAN - Extract and present the specific information requested by the user. No procedural descriptions!"
}

CONTENT EXTRACTION AND FORMATTING INSTRUCTIONS:
1. Look at the plan.steps for identified content elements
2. Extract the actual text content from those elements
3. Format it in a clear, readable way for the user
4. Return ONLY the formatted content - no procedural descriptions

EXAMPLE EXCELLENT RESULT FOR NEWS HEADLINES:
"Top Headlines:
1. Breaking: Major diplomatic crisis escalates
2. Global climate summit reaches historic agreement
3. Tech stocks surge after earnings reports"

EXAMPLE POOR RESULT TO AVOID:
"I have identified headline elements and am now extracting content..."

TASK: Extract and format the actual content identified in the plan, not describe what you're doing."#;

fn or_unknown(value: &str) -> &str {
    if value.is_empty() { "Unknown" } else { value }
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

pub fn planner_prompt(task: &str, page: &PageSnapshot) -> String {
    format!(
        "Given this task: \"{task}\"\n\n\
         And this webpage context:\n\
         - URL: {url}\n\
         - Title: {title}\n\
         - Available elements: {count} interactive elements\n\
         - Page type: {page_type}\n\n\
         {PLANNER_INSTRUCTIONS}\n",
        url = or_unknown(&page.url),
        title = or_unknown(&page.title),
        count = page.interactive_elements.len(),
        page_type = page.page_type.as_deref().unwrap_or("Unknown"),
    )
}

pub fn analyzer_prompt(page: &PageSnapshot, plan: &Plan) -> String {
    let elements: Vec<_> = page
        .interactive_elements
        .iter()
        .take(ANALYZER_MAX_ELEMENTS)
        .collect();
    format!(
        "Analyze this webpage to execute the plan.\n\n\
         Page Data:\n\
         - URL: {url}\n\
         - Title: {title}\n\
         - Text Content: {text}...\n\
         - Interactive Elements: {elements}\n\n\
         Plan Steps: {steps}\n\n\
         {ANALYZER_INSTRUCTIONS}\n",
        url = page.url,
        title = page.title,
        text = truncate_chars(&page.text, ANALYZER_TEXT_CHARS),
        elements = pretty(&elements),
        steps = serde_json::to_string(&plan.steps).unwrap_or_default(),
    )
}

pub fn executor_prompt(analysis: &Analysis, plan: &Plan) -> String {
    format!(
        "Based on this analysis and plan, generate precise executable actions with a strong emphasis on ACTUALLY EXTRACTING AND FORMATTING CONTENT.\n\n\
         Analysis: {analysis}\n\
         Plan: {plan}\n\n\
         {EXECUTOR_INSTRUCTIONS}\n",
        analysis = pretty(analysis),
        plan = pretty(plan),
    )
}

pub fn strict_retry(prompt: &str) -> String {
    format!("{prompt}\n{STRICT_JSON_REMINDER}\n")
}

pub fn problem_analysis_prompt(problem: &str, context: &Value) -> String {
    format!(
        "Analyze this problem in detail:\n\n\
         Problem: {problem}\n\n\
         Context: {context}\n\n\
         Provide:\n\
         1. Key aspects of the problem\n\
         2. Potential challenges\n\
         3. Recommended approach\n\
         4. Success criteria\n\n\
         Analysis:"
    )
}

pub fn element_selection_prompt(task: &str, elements: &Value) -> String {
    format!(
        "Given this task: {task}\n\n\
         And these available elements:\n\
         {elements}\n\n\
         Which element(s) should be used and why?\n\
         Provide the best match with reasoning.\n\n\
         Selection:"
    )
}

pub fn action_validation_prompt(action: &Value, context: &Value) -> String {
    format!(
        "Validate this proposed action:\n\n\
         Action: {action}\n\n\
         Context: {context}\n\n\
         Is this action:\n\
         1. Safe to execute?\n\
         2. Likely to succeed?\n\
         3. The best approach?\n\n\
         If not, suggest improvements.\n\n\
         Validation:"
    )
}

pub fn context_understanding_prompt(page: &Value) -> String {
    format!(
        "Understand this webpage:\n\n\
         {page}\n\n\
         Provide:\n\
         1. Page purpose and type\n\
         2. Main functionality\n\
         3. User interaction patterns\n\
         4. Key elements and their roles\n\n\
         Understanding:"
    )
}
