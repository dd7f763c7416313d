use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::brain::ModelSettings;
use crate::extract::ExtractionMode;
use crate::pipeline::PipelineOptions;

/// Token cap for the agent pipeline's completions.
pub const AGENT_MAX_TOKENS: u32 = 1500;

/// Which strategy answers `/api/task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Planner → Analyzer → Executor over the chat model
    Agents,
    /// Keyword matching on the page snapshot, no model calls
    Keyword,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "browsing-copilot", version, about = "Backend for the browsing copilot extension")]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8001)]
    pub port: u16,

    /// Used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "OPENAI_API_KEY", default_value = "ollama", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "CHAT_MODEL", default_value = "qwen2.5:0.5b")]
    pub chat_model: String,

    #[arg(long, env = "REASONING_MODEL", default_value = "qwen2.5:7b")]
    pub reasoning_model: String,

    #[arg(long, env = "BASE_URL", default_value = "http://localhost:11434/v1")]
    pub base_url: String,

    #[arg(long, env = "BACKEND", value_enum, default_value_t = Backend::Agents)]
    pub backend: Backend,

    #[arg(long, env = "SESSION_CAPACITY", default_value_t = 256)]
    pub session_capacity: usize,

    /// Idle seconds before a session is dropped (0 = never)
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 3600)]
    pub session_ttl_secs: u64,

    /// Per-stage model timeout in seconds (0 = none)
    #[arg(long, env = "STAGE_TIMEOUT_SECS", default_value_t = 120)]
    pub stage_timeout_secs: u64,

    /// Require replies to be a bare JSON object, re-asking once before falling back
    #[arg(long, env = "STRICT_JSON")]
    pub strict_json: bool,
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        non_zero_secs(self.session_ttl_secs)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            mode: if self.strict_json {
                ExtractionMode::Strict
            } else {
                ExtractionMode::Greedy
            },
            stage_timeout: non_zero_secs(self.stage_timeout_secs),
        }
    }

    /// Fill in what a request left out.
    pub fn resolve(&self, overrides: &ModelOverrides) -> ResolvedModels {
        let api_key = overrides.api_key.clone().unwrap_or_else(|| self.api_key.clone());
        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| Some(self.base_url.clone()))
            .filter(|url| !url.is_empty());
        ResolvedModels {
            chat: ModelSettings::new(
                api_key.clone(),
                overrides.chat_model.clone().unwrap_or_else(|| self.chat_model.clone()),
            )
            .with_base_url(base_url.clone())
            .with_max_tokens(AGENT_MAX_TOKENS),
            reasoning: ModelSettings::new(
                api_key,
                overrides
                    .reasoning_model
                    .clone()
                    .unwrap_or_else(|| self.reasoning_model.clone()),
            )
            .with_base_url(base_url),
        }
    }
}

/// Model fields a request may set.
#[derive(Debug, Clone, Default)]
pub struct ModelOverrides {
    pub api_key: Option<String>,
    pub chat_model: Option<String>,
    pub reasoning_model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModels {
    pub chat: ModelSettings,
    pub reasoning: ModelSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["browsing-copilot"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags() {
        let cfg = config(&[
            "--port",
            "9000",
            "--backend",
            "keyword",
            "--session-ttl-secs",
            "0",
            "--strict-json",
        ]);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.backend, Backend::Keyword);
        assert!(cfg.session_ttl().is_none());
        assert_eq!(cfg.pipeline_options().mode, ExtractionMode::Strict);
    }

    #[test]
    fn test_request_overrides_win() {
        let cfg = config(&["--api-key", "server-key", "--chat-model", "server-chat"]);
        let resolved = cfg.resolve(&ModelOverrides {
            chat_model: Some("gpt-4".into()),
            base_url: Some("https://api.openai.com/v1".into()),
            ..Default::default()
        });
        assert_eq!(resolved.chat.model, "gpt-4");
        assert_eq!(resolved.chat.api_key, "server-key");
        assert_eq!(resolved.chat.max_tokens, Some(AGENT_MAX_TOKENS));
        assert_eq!(resolved.reasoning.max_tokens, None);
        assert_eq!(
            resolved.reasoning.base_url.as_deref(),
            Some("https://api.openai.com/v1")
        );
    }

    #[test]
    fn test_stage_timeout_zero_disables() {
        let cfg = config(&["--stage-timeout-secs", "0"]);
        assert!(cfg.pipeline_options().stage_timeout.is_none());
        let cfg = config(&["--stage-timeout-secs", "30"]);
        assert_eq!(
            cfg.pipeline_options().stage_timeout,
            Some(Duration::from_secs(30))
        );
    }
}
