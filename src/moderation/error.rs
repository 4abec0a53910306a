//! Error types for the moderation engine
//!
//! Silent outcomes (disabled monitor, unmoderated channel, skipped user,
//! filtered message) are not errors; see `MessageOutcome` in the monitor.

use derive_more::Display;
use thiserror::Error;

/// Why a decision was refused before any enforcement call was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DenialReason {
    /// The per-minute action budget is exhausted
    #[display("rate limited")]
    RateLimited,
    /// The chosen tool is not in the configured allow-list
    #[display("tool not allowed")]
    ToolNotAllowed,
}

/// Errors that can occur while evaluating or executing a moderation decision
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The oracle could not be reached or returned an unusable response
    #[error("Oracle call failed: {0}")]
    OracleCallFailed(String),

    /// The oracle selected a tool with arguments that do not parse or validate
    #[error("Malformed tool call for {tool}: {reason}")]
    MalformedToolCall { tool: String, reason: String },

    /// The oracle selected a tool that is not in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Admission control refused the decision
    #[error("Action denied: {0}")]
    AdmissionDenied(DenialReason),

    /// A username could not be turned into a stable user id
    #[error("Failed to resolve user {username}: {reason}")]
    IdentityResolutionFailed { username: String, reason: String },

    /// The identity collaborator has no such user
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The enforcement collaborator rejected or failed the call
    #[error("{0}")]
    EnforcementCallFailed(String),

    /// The enforcement backend has no equivalent for this operation
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(String),

    /// Sending a chat message failed
    #[error("Chat transport error: {0}")]
    Transport(String),

    /// Appending to the audit store failed
    #[error("Audit write failed: {0}")]
    AuditWrite(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ModerationError {
    /// Build a `MalformedToolCall` error
    pub fn malformed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedToolCall {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error ends evaluation of a message (no audit record is written)
    #[must_use]
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            Self::OracleCallFailed(_) | Self::MalformedToolCall { .. } | Self::UnknownTool(_)
        )
    }
}

/// Result type for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;
