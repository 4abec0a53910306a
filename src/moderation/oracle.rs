//! Oracle integration
//!
//! The oracle is the language model that decides what to do with a message.
//! It is reached through a fixed request/response contract; the HTTP client
//! lives behind the "llm" feature.

use crate::moderation::{ModerationResult, Tool};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// One transcript entry sent to the oracle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleMessage {
    pub role: String,
    pub content: String,
}

impl OracleMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A tool the oracle may select
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&Tool> for ToolDefinition {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.as_str().to_string(),
            description: tool.description.to_string(),
            parameters: tool.schema(),
        }
    }
}

/// Everything the oracle sees for one decision
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub system: String,
    pub messages: Vec<OracleMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// A raw tool selection: name plus JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSelection {
    pub name: String,
    pub arguments: String,
}

/// Oracle reply: free text, a tool selection, or both
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OracleResponse {
    pub content: Option<String>,
    pub tool_call: Option<ToolSelection>,
}

/// The decision oracle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Model identifier recorded in the audit trail
    fn model_name(&self) -> String;

    /// Run one completion
    async fn complete(&self, request: OracleRequest) -> ModerationResult<OracleResponse>;
}

/// Oracle used when the "llm" feature is off; it never selects a tool
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticOracle;

#[async_trait]
impl Oracle for StaticOracle {
    fn model_name(&self) -> String {
        "static".to_string()
    }

    async fn complete(&self, _request: OracleRequest) -> ModerationResult<OracleResponse> {
        Ok(OracleResponse {
            content: Some("LLM integration disabled".to_string()),
            tool_call: None,
        })
    }
}

#[cfg(feature = "llm")]
pub use self::http::OpenAiOracle;

#[cfg(feature = "llm")]
mod http {
    use super::{Oracle, OracleMessage, OracleRequest, OracleResponse, ToolSelection};
    use crate::config::OracleConfig;
    use crate::moderation::{ModerationError, ModerationResult};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use std::time::Duration;
    use tracing::debug;

    #[derive(Debug, Serialize)]
    struct ChatCompletionRequest<'a> {
        model: &'a str,
        messages: Vec<OracleMessage>,
        tools: Vec<ToolDef<'a>>,
        tool_choice: &'static str,
        temperature: f32,
        max_tokens: u32,
    }

    #[derive(Debug, Serialize)]
    struct ToolDef<'a> {
        #[serde(rename = "type")]
        typ: &'static str,
        function: FunctionDef<'a>,
    }

    #[derive(Debug, Serialize)]
    struct FunctionDef<'a> {
        name: &'a str,
        description: &'a str,
        parameters: &'a Value,
    }

    #[derive(Debug, Deserialize)]
    struct ChatCompletionResponse {
        #[serde(default)]
        choices: Vec<Choice>,
    }

    #[derive(Debug, Deserialize)]
    struct Choice {
        message: AssistantMessage,
    }

    #[derive(Debug, Deserialize)]
    struct AssistantMessage {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        tool_calls: Option<Vec<ToolCallOut>>,
    }

    #[derive(Debug, Deserialize)]
    struct ToolCallOut {
        function: FunctionCall,
    }

    #[derive(Debug, Deserialize)]
    struct FunctionCall {
        name: String,
        #[serde(default)]
        arguments: String,
    }

    /// OpenAI-compatible chat completions client
    pub struct OpenAiOracle {
        client: reqwest::Client,
        endpoint: String,
        model: String,
        api_key: Option<String>,
        temperature: f32,
        max_tokens: u32,
    }

    impl OpenAiOracle {
        /// Build a client from config; the API key is read from the configured env var
        ///
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be constructed.
        pub fn new(config: &OracleConfig) -> ModerationResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .map_err(|e| ModerationError::Config(format!("oracle HTTP client: {e}")))?;

            Ok(Self {
                client,
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
                api_key: std::env::var(&config.api_key_env).ok(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            })
        }
    }

    #[async_trait]
    impl Oracle for OpenAiOracle {
        fn model_name(&self) -> String {
            self.model.clone()
        }

        async fn complete(&self, request: OracleRequest) -> ModerationResult<OracleResponse> {
            let mut messages = Vec::with_capacity(request.messages.len() + 1);
            messages.push(OracleMessage {
                role: "system".to_string(),
                content: request.system,
            });
            messages.extend(request.messages);

            let body = ChatCompletionRequest {
                model: &self.model,
                messages,
                tools: request
                    .tools
                    .iter()
                    .map(|tool| ToolDef {
                        typ: "function",
                        function: FunctionDef {
                            name: &tool.name,
                            description: &tool.description,
                            parameters: &tool.parameters,
                        },
                    })
                    .collect(),
                tool_choice: "auto",
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let mut req = self.client.post(&self.endpoint).json(&body);
            if let Some(ref key) = self.api_key {
                req = req.bearer_auth(key);
            }

            let res = req
                .send()
                .await
                .map_err(|e| ModerationError::OracleCallFailed(e.to_string()))?;
            let status = res.status();
            let text = res
                .text()
                .await
                .map_err(|e| ModerationError::OracleCallFailed(e.to_string()))?;
            parse_completion(status, &text)
        }
    }

    /// Map a chat-completions reply onto an [`OracleResponse`]
    ///
    /// No tool call (absent or empty list) is a valid reply; only the first
    /// of several tool calls is kept. Blank content counts as none.
    fn parse_completion(status: StatusCode, body: &str) -> ModerationResult<OracleResponse> {
        if !status.is_success() {
            return Err(ModerationError::OracleCallFailed(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
            ModerationError::OracleCallFailed(format!("response parse error: {e}"))
        })?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModerationError::OracleCallFailed("no choices".to_string()))?
            .message;

        let tool_calls = message.tool_calls.unwrap_or_default();
        if tool_calls.len() > 1 {
            debug!(count = tool_calls.len(), "Oracle returned several tool calls, using the first");
        }

        Ok(OracleResponse {
            content: message.content.filter(|c| !c.trim().is_empty()),
            tool_call: tool_calls.into_iter().next().map(|call| ToolSelection {
                name: call.function.name,
                arguments: call.function.arguments,
            }),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::ToolName;

    #[test]
    fn test_tool_definition_from_catalog() {
        let def = ToolDefinition::from(ToolName::SlowMode.tool());
        assert_eq!(def.name, "slow_mode");
        assert_eq!(def.parameters["properties"]["wait_seconds"]["maximum"], 120);
    }

    #[tokio::test]
    async fn test_static_oracle_never_selects() {
        let oracle = StaticOracle;
        let response = oracle
            .complete(OracleRequest {
                system: String::new(),
                messages: vec![OracleMessage::user("hello")],
                tools: Vec::new(),
            })
            .await
            .unwrap();
        assert!(response.tool_call.is_none());
        assert_eq!(oracle.model_name(), "static");
    }
}
