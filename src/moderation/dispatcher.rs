//! Action dispatcher
//!
//! Maps a decision's tool onto the enforcement backend. Admission control and
//! the allow-list are checked before anything else; a denied decision never
//! reaches the backend.

use crate::config::ModerationConfig;
use crate::moderation::{
    ChannelRef, ChatMessage, Decision, DenialReason, ModerationError, ModerationResult,
    RateLimiter, ToolCall,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Error text recorded for dry-run executions
pub const DRY_RUN_MARKER: &str = "dry run — no action taken";

const DEFAULT_TIMEOUT_SECONDS: u32 = 60;
const DEFAULT_TIMEOUT_REASON: &str = "Timed out by automated moderation";
const DEFAULT_BAN_REASON: &str = "Banned by automated moderation";
const DEFAULT_SLOW_MODE_SECONDS: u32 = 30;
const DEFAULT_FOLLOWER_MINUTES: u32 = 0;
const DEFAULT_POLL_SECONDS: u32 = 60;
const DEFAULT_PREDICTION_SECONDS: u32 = 120;
const DEFAULT_ANNOUNCEMENT_COLOR: &str = "primary";

/// Partial chat-mode update; `None` leaves a setting unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatSettingsUpdate {
    pub emote_mode: Option<bool>,
    pub subscriber_mode: Option<bool>,
    pub follower_mode: Option<bool>,
    pub follower_mode_duration_minutes: Option<u32>,
    pub slow_mode: Option<bool>,
    pub slow_mode_wait_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollRequest {
    pub title: String,
    pub choices: Vec<String>,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionRequest {
    pub title: String,
    pub outcomes: Vec<String>,
    pub window_seconds: u32,
}

/// The backend that carries out moderation operations
///
/// Every operation returns the backend's raw response for the audit trail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Enforcement: Send + Sync {
    /// Ban a user; a duration of 0 is permanent, anything else is a timeout
    async fn ban(
        &self,
        channel: &ChannelRef,
        user_id: &str,
        duration_seconds: u32,
        reason: &str,
    ) -> ModerationResult<Value>;
    async fn unban(&self, channel: &ChannelRef, user_id: &str) -> ModerationResult<Value>;
    async fn delete_message(&self, channel: &ChannelRef, message_id: &str)
    -> ModerationResult<Value>;
    async fn clear_chat(&self, channel: &ChannelRef) -> ModerationResult<Value>;
    async fn update_chat_settings(
        &self,
        channel: &ChannelRef,
        settings: ChatSettingsUpdate,
    ) -> ModerationResult<Value>;
    async fn add_moderator(&self, channel: &ChannelRef, user_id: &str) -> ModerationResult<Value>;
    async fn remove_moderator(&self, channel: &ChannelRef, user_id: &str)
    -> ModerationResult<Value>;
    async fn add_vip(&self, channel: &ChannelRef, user_id: &str) -> ModerationResult<Value>;
    async fn remove_vip(&self, channel: &ChannelRef, user_id: &str) -> ModerationResult<Value>;
    async fn create_poll(&self, channel: &ChannelRef, poll: PollRequest) -> ModerationResult<Value>;
    async fn end_poll(
        &self,
        channel: &ChannelRef,
        poll_id: &str,
        archive: bool,
    ) -> ModerationResult<Value>;
    async fn create_prediction(
        &self,
        channel: &ChannelRef,
        prediction: PredictionRequest,
    ) -> ModerationResult<Value>;
    async fn resolve_prediction(
        &self,
        channel: &ChannelRef,
        prediction_id: &str,
        winning_outcome_id: &str,
    ) -> ModerationResult<Value>;
    async fn cancel_prediction(
        &self,
        channel: &ChannelRef,
        prediction_id: &str,
    ) -> ModerationResult<Value>;
    async fn send_announcement(
        &self,
        channel: &ChannelRef,
        message: &str,
        color: &str,
    ) -> ModerationResult<Value>;
    async fn send_shoutout(&self, channel: &ChannelRef, user_id: &str) -> ModerationResult<Value>;
}

/// Username to stable user id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// # Errors
    ///
    /// `UserNotFound` when no such user exists.
    async fn resolve(&self, channel: &ChannelRef, username: &str) -> ModerationResult<String>;
}

/// Outgoing chat, used for warnings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, channel: &ChannelRef, text: &str) -> ModerationResult<()>;
}

/// Normalized outcome of an attempted action
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub dry_run: bool,
    pub raw_response: Option<Value>,
    pub target_user_id: Option<String>,
    pub error: Option<String>,
}

/// Routes decisions to the enforcement backend
pub struct ActionDispatcher {
    config: Arc<ModerationConfig>,
    limiter: Arc<RateLimiter>,
    enforcement: Arc<dyn Enforcement>,
    identity: Arc<dyn IdentityResolver>,
    chat: Arc<dyn ChatTransport>,
}

impl ActionDispatcher {
    pub fn new(
        config: Arc<ModerationConfig>,
        limiter: Arc<RateLimiter>,
        enforcement: Arc<dyn Enforcement>,
        identity: Arc<dyn IdentityResolver>,
        chat: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            config,
            limiter,
            enforcement,
            identity,
            chat,
        }
    }

    /// Attempt the decision's action
    ///
    /// Handler failures (identity, enforcement, transport) come back as an
    /// unsuccessful [`ExecutionResult`]; they still count as attempted.
    ///
    /// # Errors
    ///
    /// `AdmissionDenied` when the action budget is spent, or the tool is not
    /// allowed (not in the allow-list, or elevated while elevated tools are
    /// off). No backend call is made in either case.
    pub async fn execute(
        &self,
        decision: &mut Decision,
        message: &ChatMessage,
    ) -> ModerationResult<ExecutionResult> {
        let tool = decision.tool_name();

        if !self.limiter.try_acquire() {
            return Err(ModerationError::AdmissionDenied(DenialReason::RateLimited));
        }
        let elevated_denied = tool.is_elevated() && !self.config.allow_elevated_tools;
        if elevated_denied || !self.config.is_tool_allowed(tool.as_str()) {
            return Err(ModerationError::AdmissionDenied(DenialReason::ToolNotAllowed));
        }

        if self.config.dry_run {
            debug!(tool = %tool, "Dry run, skipping enforcement");
            return Ok(ExecutionResult {
                success: true,
                dry_run: true,
                raw_response: None,
                target_user_id: None,
                error: Some(DRY_RUN_MARKER.to_string()),
            });
        }

        let outcome = self.route(decision, message).await;
        let target_user_id = decision.target_user_id.clone();
        Ok(match outcome {
            Ok(raw) => ExecutionResult {
                success: true,
                dry_run: false,
                raw_response: Some(raw),
                target_user_id,
                error: None,
            },
            Err(e) => {
                warn!(tool = %tool, error = %e, "Moderation action failed");
                ExecutionResult {
                    success: false,
                    dry_run: false,
                    raw_response: None,
                    target_user_id,
                    error: Some(e.to_string()),
                }
            }
        })
    }

    /// Resolve `username` and record the id on the decision
    async fn resolve(
        &self,
        decision: &mut Decision,
        channel: &ChannelRef,
        username: &str,
    ) -> ModerationResult<String> {
        let user_id = self
            .identity
            .resolve(channel, username)
            .await
            .map_err(|e| match e {
                ModerationError::IdentityResolutionFailed { .. } => e,
                other => ModerationError::IdentityResolutionFailed {
                    username: username.to_string(),
                    reason: other.to_string(),
                },
            })?;
        decision.target_user_id = Some(user_id.clone());
        Ok(user_id)
    }

    async fn route(
        &self,
        decision: &mut Decision,
        message: &ChatMessage,
    ) -> ModerationResult<Value> {
        let channel = &message.channel;
        let enforcement = self.enforcement.as_ref();
        let call = decision.tool.clone();

        match call {
            ToolCall::NoAction(_) => Ok(Value::Null),
            ToolCall::WarnUser(args) => {
                let text = format!("@{} {}", args.username, args.message);
                self.chat.send(channel, &text).await?;
                Ok(json!({ "sent": text }))
            }
            ToolCall::TimeoutUser(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                let duration = args.duration_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
                let reason = args.reason.as_deref().unwrap_or(DEFAULT_TIMEOUT_REASON);
                enforcement.ban(channel, &user_id, duration, reason).await
            }
            ToolCall::BanUser(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                let reason = args.reason.as_deref().unwrap_or(DEFAULT_BAN_REASON);
                enforcement.ban(channel, &user_id, 0, reason).await
            }
            ToolCall::UnbanUser(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                enforcement.unban(channel, &user_id).await
            }
            ToolCall::DeleteMessage(args) => {
                let message_id = args.message_id.as_deref().unwrap_or(&message.id);
                enforcement.delete_message(channel, message_id).await
            }
            ToolCall::ClearChat(_) => enforcement.clear_chat(channel).await,
            ToolCall::EmoteOnlyMode(args) => {
                let settings = ChatSettingsUpdate {
                    emote_mode: Some(args.enabled),
                    ..ChatSettingsUpdate::default()
                };
                enforcement.update_chat_settings(channel, settings).await
            }
            ToolCall::SubscriberOnlyMode(args) => {
                let settings = ChatSettingsUpdate {
                    subscriber_mode: Some(args.enabled),
                    ..ChatSettingsUpdate::default()
                };
                enforcement.update_chat_settings(channel, settings).await
            }
            ToolCall::FollowerOnlyMode(args) => {
                let settings = ChatSettingsUpdate {
                    follower_mode: Some(args.enabled),
                    follower_mode_duration_minutes: args
                        .enabled
                        .then(|| args.duration_minutes.unwrap_or(DEFAULT_FOLLOWER_MINUTES)),
                    ..ChatSettingsUpdate::default()
                };
                enforcement.update_chat_settings(channel, settings).await
            }
            ToolCall::SlowMode(args) => {
                let settings = ChatSettingsUpdate {
                    slow_mode: Some(args.enabled),
                    slow_mode_wait_seconds: args
                        .enabled
                        .then(|| args.wait_seconds.unwrap_or(DEFAULT_SLOW_MODE_SECONDS)),
                    ..ChatSettingsUpdate::default()
                };
                enforcement.update_chat_settings(channel, settings).await
            }
            ToolCall::AddModerator(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                enforcement.add_moderator(channel, &user_id).await
            }
            ToolCall::RemoveModerator(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                enforcement.remove_moderator(channel, &user_id).await
            }
            ToolCall::AddVip(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                enforcement.add_vip(channel, &user_id).await
            }
            ToolCall::RemoveVip(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                enforcement.remove_vip(channel, &user_id).await
            }
            ToolCall::CreatePoll(args) => {
                let poll = PollRequest {
                    title: args.title,
                    choices: args.choices,
                    duration_seconds: args.duration_seconds.unwrap_or(DEFAULT_POLL_SECONDS),
                };
                enforcement.create_poll(channel, poll).await
            }
            ToolCall::EndPoll(args) => {
                enforcement
                    .end_poll(channel, &args.poll_id, args.archive.unwrap_or(false))
                    .await
            }
            ToolCall::CreatePrediction(args) => {
                let prediction = PredictionRequest {
                    title: args.title,
                    outcomes: args.outcomes,
                    window_seconds: args
                        .prediction_window_seconds
                        .unwrap_or(DEFAULT_PREDICTION_SECONDS),
                };
                enforcement.create_prediction(channel, prediction).await
            }
            ToolCall::ResolvePrediction(args) => {
                enforcement
                    .resolve_prediction(channel, &args.prediction_id, &args.winning_outcome_id)
                    .await
            }
            ToolCall::CancelPrediction(args) => {
                enforcement
                    .cancel_prediction(channel, &args.prediction_id)
                    .await
            }
            ToolCall::SendAnnouncement(args) => {
                let color = args.color.as_deref().unwrap_or(DEFAULT_ANNOUNCEMENT_COLOR);
                enforcement
                    .send_announcement(channel, &args.message, color)
                    .await
            }
            ToolCall::SendShoutout(args) => {
                let user_id = self.resolve(decision, channel, &args.username).await?;
                enforcement.send_shoutout(channel, &user_id).await
            }
        }
    }
}
