use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{ModelError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Everything needed to reach one model on an OpenAI-compatible server.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A chat model that answers a single prompt with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Builds a model client from per-request settings.
pub trait ModelFactory: Send + Sync {
    fn build(&self, settings: &ModelSettings) -> Arc<dyn ChatModel>;
}

/// Chat-completions client. Works against OpenAI or any server exposing the
/// same `/chat/completions` route (Ollama, vLLM, LM Studio).
pub struct OpenAiChat {
    client: Client,
    settings: ModelSettings,
}

impl OpenAiChat {
    pub fn new(client: Client, settings: ModelSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut body = json!({
            "model": self.settings.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.settings.temperature,
        });
        if let Some(max_tokens) = self.settings.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        debug!(model = %self.settings.model, endpoint = %self.endpoint(), "sending chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&raw)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(raw);
            warn!(status = status.as_u16(), %message, "chat completion rejected");
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json_resp: Value =
            serde_json::from_str(&raw).map_err(|_| ModelError::EmptyResponse(raw.clone()))?;
        let content = json_resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ModelError::EmptyResponse(json_resp.to_string()))?;

        Ok(content.to_string())
    }
}

/// Hands out [`OpenAiChat`] clients sharing one connection pool.
#[derive(Clone, Default)]
pub struct OpenAiFactory {
    client: Client,
}

impl OpenAiFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ModelFactory for OpenAiFactory {
    fn build(&self, settings: &ModelSettings) -> Arc<dyn ChatModel> {
        Arc::new(OpenAiChat::new(self.client.clone(), settings.clone()))
    }
}

/// Transcript entries kept per role; older ones are dropped first.
pub const MEMORY_LIMIT: usize = 50;

/// One entry of a role's transcript.
#[derive(Debug, Clone, Serialize)]
pub struct AgentMessage {
    pub sender: String,
    pub content: String,
    pub metadata: Value,
}

/// A named role in front of a chat model. Remembers what it said.
pub struct Brain {
    name: &'static str,
    role: &'static str,
    model: Arc<dyn ChatModel>,
    memory: Mutex<Vec<AgentMessage>>,
}

impl Brain {
    pub fn new(name: &'static str, role: &'static str, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name,
            role,
            model,
            memory: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Role preamble, then the context block (if any), then the prompt body.
    pub fn compose(&self, prompt: &str, context: Option<&Value>) -> String {
        let mut full = format!("You are {}, a {}. ", self.name, self.role);
        if let Some(ctx) = context.filter(|c| !is_empty(c)) {
            let rendered = serde_json::to_string_pretty(ctx).unwrap_or_else(|_| ctx.to_string());
            full.push_str(&format!("\n\nContext: {rendered}"));
        }
        full.push_str(&format!("\n\n{prompt}"));
        full
    }

    pub async fn think(&self, prompt: &str, context: Option<&Value>) -> Result<String> {
        let full_prompt = self.compose(prompt, context);
        let content = self.model.complete(&full_prompt).await?;
        debug!(agent = self.name, chars = content.len(), "model replied");

        let mut memory = self.memory.lock();
        memory.push(AgentMessage {
            sender: self.name.to_string(),
            content: content.clone(),
            metadata: json!({ "context": context.cloned().unwrap_or_else(|| json!({})) }),
        });
        let overflow = memory.len().saturating_sub(MEMORY_LIMIT);
        memory.drain(..overflow);
        drop(memory);

        Ok(content)
    }

    pub fn memory(&self) -> Vec<AgentMessage> {
        self.memory.lock().clone()
    }

    pub fn clear_memory(&self) {
        self.memory.lock().clear();
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {}", prompt.len()))
        }
    }

    fn settings_for(server: &MockServer) -> ModelSettings {
        ModelSettings::new("test-key", "qwen2.5:0.5b")
            .with_base_url(Some(format!("{}/v1/", server.uri())))
            .with_max_tokens(1500)
    }

    #[tokio::test]
    async fn test_complete_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:0.5b",
                "max_tokens": 1500,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(Client::new(), settings_for(&server));
        assert_eq!(chat.complete("hello").await.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(Client::new(), settings_for(&server));
        match chat.complete("hello").await {
            Err(ModelError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(Client::new(), settings_for(&server));
        assert!(matches!(
            chat.complete("hello").await,
            Err(ModelError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_default_endpoint() {
        let chat = OpenAiChat::new(Client::new(), ModelSettings::new("k", "gpt-4"));
        assert_eq!(chat.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_memory_is_bounded() {
        let replies: Vec<String> = (0..MEMORY_LIMIT + 5).map(|i| format!("reply {i}")).collect();
        let model = Arc::new(crate::agents::testing::ScriptedModel::new(replies));
        let brain = Brain::new("Analyzer", "page analyzer", model);
        for _ in 0..MEMORY_LIMIT + 5 {
            brain.think("next", None).await.unwrap();
        }
        let memory = brain.memory();
        assert_eq!(memory.len(), MEMORY_LIMIT);
        assert_eq!(memory[0].content, "reply 5");
    }

    #[test]
    fn test_compose_skips_empty_context() {
        let brain = Brain::new("Planner", "strategic planner", Arc::new(Echo));
        let prompt = brain.compose("Do it", Some(&json!({})));
        assert_eq!(prompt, "You are Planner, a strategic planner. \n\nDo it");

        let with_ctx = brain.compose("Do it", Some(&json!({"url": "https://a.b"})));
        assert!(with_ctx.contains("Context: {\n  \"url\": \"https://a.b\"\n}"));
    }

    #[tokio::test]
    async fn test_think_records_transcript() {
        let brain = Brain::new("Executor", "precise task executor", Arc::new(Echo));
        brain.think("first", None).await.unwrap();
        brain.think("second", Some(&json!({"k": 1}))).await.unwrap();

        let memory = brain.memory();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory[0].sender, "Executor");
        assert_eq!(memory[0].metadata, json!({"context": {}}));
        assert_eq!(memory[1].metadata["context"]["k"], 1);

        brain.clear_memory();
        assert!(brain.memory().is_empty());
    }
}
