//! Chat moderation engine
//!
//! Messages flow through the [`Monitor`]: skip-list and quick filter, recent
//! history, an oracle decision, admission control, dispatch to the
//! enforcement backend, and finally one audit record.

mod audit;
mod decision;
mod dispatcher;
mod error;
mod filter;
mod history;
mod limiter;
mod metrics;
mod monitor;
mod oracle;
pub mod tools;

pub use audit::{AuditStore, JsonlAuditStore, MemoryAuditStore, ModAction};
pub use decision::{Decision, DecisionEngine, EvaluationContext, NO_TOOL_CALL_REASONING};
pub use dispatcher::{
    ActionDispatcher, ChatSettingsUpdate, ChatTransport, DRY_RUN_MARKER, Enforcement,
    ExecutionResult, IdentityResolver, PollRequest, PredictionRequest,
};
pub use error::{DenialReason, ModerationError, ModerationResult};
pub use filter::{SkipList, needs_evaluation, should_skip_user};
pub use history::HistoryBuffer;
pub use limiter::{LimiterStatus, RateLimiter};
pub use metrics::{Counter, MetricsSink, MonitorStats, StatsSnapshot};
pub use monitor::{DropReason, IntakeSender, MessageOutcome, Monitor, MonitorInspector, MonitorParts};
pub use oracle::{Oracle, OracleMessage, OracleRequest, OracleResponse, StaticOracle, ToolDefinition, ToolSelection};
#[cfg(feature = "llm")]
pub use oracle::OpenAiOracle;
pub use tools::{Tool, ToolCall, ToolName};

#[cfg(test)]
pub use dispatcher::{MockChatTransport, MockEnforcement, MockIdentityResolver};
#[cfg(test)]
pub use oracle::MockOracle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a message was posted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Stable channel id
    pub id: String,
    /// Human-readable channel name
    pub name: String,
    /// Guild (server) the channel belongs to, when the transport has one
    pub guild_id: Option<String>,
}

impl ChannelRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            guild_id: None,
        }
    }

    #[must_use]
    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }
}

/// A chat message as delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: ChannelRef,
    /// Transport-assigned message id
    pub id: String,
    /// Username of the author
    pub author: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        channel: ChannelRef,
        id: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            id: id.into(),
            author: author.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}
