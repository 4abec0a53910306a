//! Decision engine
//!
//! Turns one message plus its recent history into a single oracle request
//! and parses the reply into a [`Decision`]. There is no retry: a failed or
//! malformed call leaves the message unmoderated for this pass.

use crate::config::Sensitivity;
use crate::moderation::{
    ChatMessage, ModerationResult, Oracle, OracleMessage, OracleRequest, Tool, ToolCall,
    ToolDefinition, ToolName,
};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Reasoning recorded when the oracle answers without selecting a tool
pub const NO_TOOL_CALL_REASONING: &str = "no tool call in response";

const INSTRUCTIONS: &str = "You are a chat moderator. Read the recent conversation and decide \
whether the final message needs a moderation action. Choose exactly one tool. Prefer no_action \
unless the message clearly breaks the rules; act on the message author, not on users who are \
merely mentioned. Always give a short reason.";

/// Everything the oracle is told about one message
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub message: ChatMessage,
    /// Recent channel history, oldest first; may include `message` itself
    pub history: Vec<ChatMessage>,
    pub rules: Vec<String>,
    pub sensitivity: Sensitivity,
}

/// Parsed oracle output for one message
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// False iff the tool is `no_action`
    pub should_act: bool,
    pub tool: ToolCall,
    /// Raw argument map as the oracle sent it
    pub parameters: Map<String, Value>,
    pub reasoning: String,
    /// Model that produced the decision
    pub model: String,
    /// Filled in by the dispatcher once identity resolution succeeds
    pub target_user_id: Option<String>,
}

impl Decision {
    /// A decision to do nothing
    #[must_use]
    pub fn no_action(reasoning: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            should_act: false,
            tool: ToolCall::default(),
            parameters: Map::new(),
            reasoning: reasoning.into(),
            model: model.into(),
            target_user_id: None,
        }
    }

    /// Wrap a parsed tool call
    #[must_use]
    pub fn from_call(
        tool: ToolCall,
        parameters: Map<String, Value>,
        content: Option<&str>,
        model: impl Into<String>,
    ) -> Self {
        let reasoning = tool
            .reason()
            .or(content)
            .map(str::to_string)
            .unwrap_or_default();
        Self {
            should_act: tool.name() != ToolName::NoAction,
            tool,
            parameters,
            reasoning,
            model: model.into(),
            target_user_id: None,
        }
    }

    #[must_use]
    pub fn tool_name(&self) -> ToolName {
        self.tool.name()
    }
}

/// Asks the oracle what to do with a message
pub struct DecisionEngine {
    oracle: Arc<dyn Oracle>,
}

impl DecisionEngine {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Evaluate one message against the allowed tool vocabulary
    ///
    /// # Errors
    ///
    /// `OracleCallFailed` if the oracle call fails, `UnknownTool` or
    /// `MalformedToolCall` if its tool selection does not parse.
    pub async fn evaluate(
        &self,
        ctx: &EvaluationContext,
        allowed_tools: &[&Tool],
    ) -> ModerationResult<Decision> {
        let request = build_request(ctx, allowed_tools);
        let model = self.oracle.model_name();
        let response = self.oracle.complete(request).await?;

        let Some(selection) = response.tool_call else {
            debug!(message_id = %ctx.message.id, "Oracle made no tool selection");
            return Ok(Decision::no_action(NO_TOOL_CALL_REASONING, model));
        };

        let (call, parameters) = ToolCall::parse(&selection.name, &selection.arguments)?;
        Ok(Decision::from_call(
            call,
            parameters,
            response.content.as_deref(),
            model,
        ))
    }
}

fn system_prompt(ctx: &EvaluationContext) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    let _ = write!(prompt, "\n\nModeration sensitivity: {}.", ctx.sensitivity);
    if !ctx.rules.is_empty() {
        prompt.push_str("\n\nChannel rules:");
        for (i, rule) in ctx.rules.iter().enumerate() {
            let _ = write!(prompt, "\n{}. {rule}", i + 1);
        }
    }
    prompt
}

fn transcript(ctx: &EvaluationContext) -> String {
    let mut text = format!("Channel: #{}\n\nRecent messages:\n", ctx.message.channel.name);
    let mut earlier = ctx
        .history
        .iter()
        .filter(|message| message.id != ctx.message.id)
        .peekable();
    if earlier.peek().is_none() {
        text.push_str("(none)\n");
    }
    for message in earlier {
        let _ = writeln!(text, "[{}]: {}", message.author, message.text);
    }
    let _ = write!(
        text,
        "\nMessage to evaluate (id {}):\n[{}]: {}",
        ctx.message.id, ctx.message.author, ctx.message.text
    );
    text
}

/// Build the single request sent to the oracle
#[must_use]
pub fn build_request(ctx: &EvaluationContext, allowed_tools: &[&Tool]) -> OracleRequest {
    OracleRequest {
        system: system_prompt(ctx),
        messages: vec![OracleMessage::user(transcript(ctx))],
        tools: allowed_tools
            .iter()
            .map(|tool| ToolDefinition::from(*tool))
            .collect(),
    }
}
