use crate::status::{create_status_embed, format_history};
use crate::{Data, Error};
use poise::{Context, CreateReply, command};

/// Inspect the automatic moderator
#[command(
    slash_command,
    guild_only,
    subcommands("status", "history"),
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn automod(_ctx: Context<'_, Data, Error>) -> Result<(), Error> {
    Ok(())
}

/// Show the automod mode, admission budget and counters
#[command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_, Data, Error>) -> Result<(), Error> {
    let data = ctx.data();
    let embed = create_status_embed(
        &data.config.moderation,
        &data.stats.snapshot(),
        &data.inspector.limiter_status(),
        data.inspector.tracked_channels().len(),
    );
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Show the recent messages the automod keeps for this channel
#[command(slash_command, guild_only)]
pub async fn history(ctx: Context<'_, Data, Error>) -> Result<(), Error> {
    let messages = ctx
        .data()
        .inspector
        .history_snapshot(&ctx.channel_id().get().to_string());
    ctx.send(
        CreateReply::default()
            .content(format_history(&messages))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automod_command_definition() {
        let cmd = automod();
        assert_eq!(cmd.name, "automod");
        assert!(cmd.guild_only);
        let names: Vec<&str> = cmd.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["status", "history"]);
    }

    #[test]
    fn test_status_command_description() {
        let cmd = status();
        assert!(
            cmd.description
                .as_deref()
                .unwrap_or_default()
                .contains("admission budget")
        );
        assert!(cmd.create_as_slash_command().is_some());
    }
}
