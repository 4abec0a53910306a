use crate::EVENT_TARGET;
use crate::moderation::{ChannelRef, ChatMessage, IntakeSender};
use poise::serenity_prelude::{
    self as serenity, ChannelId, Context, EventHandler, GuildId, Message, Ready,
};
use tracing::{debug, info, warn};

/// Feeds guild messages into the moderation monitor
pub struct Handler {
    pub intake: IntakeSender,
}

impl Handler {
    #[must_use]
    pub fn new(intake: IntakeSender) -> Self {
        Self { intake }
    }
}

/// Channel reference for a guild channel, falling back to the id when the
/// cache has no name for it (threads, uncached guilds)
fn channel_ref(guild_id: GuildId, channel_id: ChannelId, name: Option<String>) -> ChannelRef {
    let id = channel_id.get().to_string();
    let name = name.unwrap_or_else(|| id.clone());
    ChannelRef::new(id, name).in_guild(guild_id.get().to_string())
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!("Cache ready! The bot is in {guild_count} guild(s)");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.author.id == ctx.cache.current_user().id {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let channel_name = ctx.cache.guild(guild_id).and_then(|guild| {
            guild
                .channels
                .get(&msg.channel_id)
                .map(|channel| channel.name.clone())
        });
        let channel = channel_ref(guild_id, msg.channel_id, channel_name);

        debug!(
            target: EVENT_TARGET,
            channel = %channel.name,
            author = %msg.author.name,
            event = "message",
            "Message received"
        );

        let message = ChatMessage::new(
            channel,
            msg.id.get().to_string(),
            msg.author.name.clone(),
            msg.content.clone(),
        );
        self.intake.submit(message);
    }
}
