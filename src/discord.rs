//! Discord-backed collaborators
//!
//! Discord has no polls-by-bot, predictions, VIPs, shoutouts or emote-only
//! mode; those operations report `Unsupported` and are audited as failed
//! attempts.

use crate::moderation::{
    ChannelRef, ChatSettingsUpdate, ChatTransport, Enforcement, IdentityResolver, ModerationError,
    ModerationResult, PollRequest, PredictionRequest,
};
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, Http, MessageId, UserId, builder::EditChannel};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Slow-mode delay used when enabling without an explicit value
const DEFAULT_SLOW_MODE_SECONDS: u32 = 30;

fn parse_id(kind: &str, raw: &str) -> ModerationResult<u64> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ModerationError::EnforcementCallFailed(format!("invalid {kind} id: {raw}")))
}

fn guild_of(channel: &ChannelRef) -> ModerationResult<GuildId> {
    let raw = channel.guild_id.as_deref().ok_or_else(|| {
        ModerationError::EnforcementCallFailed(format!("channel {} is not in a guild", channel.id))
    })?;
    parse_id("guild", raw).map(GuildId::new)
}

fn channel_of(channel: &ChannelRef) -> ModerationResult<ChannelId> {
    parse_id("channel", &channel.id).map(ChannelId::new)
}

fn user_of(user_id: &str) -> ModerationResult<UserId> {
    parse_id("user", user_id).map(UserId::new)
}

#[allow(clippy::needless_pass_by_value)]
fn api_error(e: poise::serenity_prelude::Error) -> ModerationError {
    ModerationError::EnforcementCallFailed(e.to_string())
}

fn unsupported(operation: &str) -> ModerationError {
    ModerationError::Unsupported(format!("{operation} has no Discord equivalent"))
}

/// Slow-mode delay in seconds for a settings update, if it touches slow mode
fn slow_mode_seconds(settings: &ChatSettingsUpdate) -> Option<u16> {
    settings.slow_mode.map(|enabled| {
        if enabled {
            let seconds = settings
                .slow_mode_wait_seconds
                .unwrap_or(DEFAULT_SLOW_MODE_SECONDS);
            u16::try_from(seconds).unwrap_or(u16::MAX)
        } else {
            0
        }
    })
}

/// Moderation operations through the Discord HTTP API
pub struct DiscordEnforcement {
    http: Arc<Http>,
}

impl DiscordEnforcement {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Enforcement for DiscordEnforcement {
    async fn ban(
        &self,
        channel: &ChannelRef,
        user_id: &str,
        duration_seconds: u32,
        reason: &str,
    ) -> ModerationResult<Value> {
        let http = self.http.as_ref();
        let guild_id = guild_of(channel)?;
        let user = user_of(user_id)?;

        if duration_seconds == 0 {
            info!("Banning user {user} in guild {guild_id}");
            guild_id
                .ban_with_reason(http, user, 0, reason)
                .await
                .map_err(api_error)?;
            return Ok(json!({ "action": "ban", "user_id": user_id }));
        }

        info!("Timing out user {user} in guild {guild_id} for {duration_seconds} seconds");
        let mut member = guild_id.member(http, user).await.map_err(api_error)?;
        let until = chrono::Utc::now() + chrono::Duration::seconds(i64::from(duration_seconds));
        member
            .disable_communication_until_datetime(http, until.into())
            .await
            .map_err(api_error)?;
        Ok(json!({
            "action": "timeout",
            "user_id": user_id,
            "until": until.to_rfc3339(),
        }))
    }

    async fn unban(&self, channel: &ChannelRef, user_id: &str) -> ModerationResult<Value> {
        let guild_id = guild_of(channel)?;
        guild_id
            .unban(self.http.as_ref(), user_of(user_id)?)
            .await
            .map_err(api_error)?;
        Ok(json!({ "action": "unban", "user_id": user_id }))
    }

    async fn delete_message(
        &self,
        channel: &ChannelRef,
        message_id: &str,
    ) -> ModerationResult<Value> {
        let message = MessageId::new(parse_id("message", message_id)?);
        channel_of(channel)?
            .delete_message(self.http.as_ref(), message)
            .await
            .map_err(api_error)?;
        Ok(json!({ "action": "delete_message", "message_id": message_id }))
    }

    async fn clear_chat(&self, _channel: &ChannelRef) -> ModerationResult<Value> {
        Err(unsupported("clear_chat"))
    }

    async fn update_chat_settings(
        &self,
        channel: &ChannelRef,
        settings: ChatSettingsUpdate,
    ) -> ModerationResult<Value> {
        let Some(seconds) = slow_mode_seconds(&settings) else {
            return Err(unsupported("emote, subscriber and follower modes"));
        };
        channel_of(channel)?
            .edit(
                self.http.as_ref(),
                EditChannel::new().rate_limit_per_user(seconds),
            )
            .await
            .map_err(api_error)?;
        Ok(json!({ "action": "slow_mode", "rate_limit_per_user": seconds }))
    }

    async fn add_moderator(&self, _channel: &ChannelRef, _user_id: &str) -> ModerationResult<Value> {
        Err(unsupported("add_moderator"))
    }

    async fn remove_moderator(
        &self,
        _channel: &ChannelRef,
        _user_id: &str,
    ) -> ModerationResult<Value> {
        Err(unsupported("remove_moderator"))
    }

    async fn add_vip(&self, _channel: &ChannelRef, _user_id: &str) -> ModerationResult<Value> {
        Err(unsupported("add_vip"))
    }

    async fn remove_vip(&self, _channel: &ChannelRef, _user_id: &str) -> ModerationResult<Value> {
        Err(unsupported("remove_vip"))
    }

    async fn create_poll(&self, _channel: &ChannelRef, _poll: PollRequest) -> ModerationResult<Value> {
        Err(unsupported("create_poll"))
    }

    async fn end_poll(
        &self,
        _channel: &ChannelRef,
        _poll_id: &str,
        _archive: bool,
    ) -> ModerationResult<Value> {
        Err(unsupported("end_poll"))
    }

    async fn create_prediction(
        &self,
        _channel: &ChannelRef,
        _prediction: PredictionRequest,
    ) -> ModerationResult<Value> {
        Err(unsupported("create_prediction"))
    }

    async fn resolve_prediction(
        &self,
        _channel: &ChannelRef,
        _prediction_id: &str,
        _winning_outcome_id: &str,
    ) -> ModerationResult<Value> {
        Err(unsupported("resolve_prediction"))
    }

    async fn cancel_prediction(
        &self,
        _channel: &ChannelRef,
        _prediction_id: &str,
    ) -> ModerationResult<Value> {
        Err(unsupported("cancel_prediction"))
    }

    async fn send_announcement(
        &self,
        channel: &ChannelRef,
        message: &str,
        _color: &str,
    ) -> ModerationResult<Value> {
        let sent = channel_of(channel)?
            .say(self.http.as_ref(), message)
            .await
            .map_err(api_error)?;
        Ok(json!({ "action": "announcement", "message_id": sent.id.get().to_string() }))
    }

    async fn send_shoutout(&self, _channel: &ChannelRef, _user_id: &str) -> ModerationResult<Value> {
        Err(unsupported("send_shoutout"))
    }
}

/// Resolves usernames through guild member search
pub struct DiscordIdentity {
    http: Arc<Http>,
}

impl DiscordIdentity {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl IdentityResolver for DiscordIdentity {
    async fn resolve(&self, channel: &ChannelRef, username: &str) -> ModerationResult<String> {
        let username = username.trim_start_matches('@');
        let guild_id = guild_of(channel)?;
        let members = guild_id
            .search_members(self.http.as_ref(), username, Some(10))
            .await
            .map_err(|e| ModerationError::IdentityResolutionFailed {
                username: username.to_string(),
                reason: e.to_string(),
            })?;

        members
            .iter()
            .find(|member| member.user.name.eq_ignore_ascii_case(username))
            .map(|member| member.user.id.get().to_string())
            .ok_or_else(|| ModerationError::UserNotFound(username.to_string()))
    }
}

/// Posts plain messages to a channel
pub struct DiscordChat {
    http: Arc<Http>,
}

impl DiscordChat {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatTransport for DiscordChat {
    async fn send(&self, channel: &ChannelRef, text: &str) -> ModerationResult<()> {
        let channel_id = channel_of(channel).map_err(|e| ModerationError::Transport(e.to_string()))?;
        channel_id
            .say(self.http.as_ref(), text)
            .await
            .map_err(|e| ModerationError::Transport(e.to_string()))?;
        Ok(())
    }
}
