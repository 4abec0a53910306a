use crate::config::ModerationConfig;
use crate::moderation::{ChatMessage, LimiterStatus, StatsSnapshot};
use poise::serenity_prelude as serenity;
use serenity::builder::CreateEmbed;
use std::fmt::Write as _;

/// Longest message text shown in a history listing
const PREVIEW_CHARS: usize = 80;
/// Discord's limit on message content
const MAX_CONTENT_CHARS: usize = 2000;

fn mode_label(config: &ModerationConfig) -> &'static str {
    match (config.enabled, config.dry_run) {
        (false, _) => "disabled",
        (true, true) => "dry run",
        (true, false) => "enforcing",
    }
}

/// One-line admission budget summary
#[must_use]
pub fn format_budget(limiter: &LimiterStatus) -> String {
    format!(
        "{}/{} actions, window resets in {}s",
        limiter.used,
        limiter.budget,
        limiter.resets_in.as_secs()
    )
}

/// Plain-text counters
#[must_use]
pub fn format_counters(stats: &StatsSnapshot) -> String {
    let mut result = String::new();
    let _ = writeln!(
        result,
        "Oracle: {} ok, {} failed",
        stats.oracle_success, stats.oracle_failure
    );
    let _ = writeln!(
        result,
        "Actions: {} ok, {} failed, {} dry run, {} no action",
        stats.action_succeeded, stats.action_failed, stats.dry_run, stats.no_action
    );
    let _ = writeln!(
        result,
        "Dropped: {} denied, {} filtered, {} intake",
        stats.admission_denied, stats.filtered, stats.intake_dropped
    );
    if stats.audit_failure > 0 {
        let _ = writeln!(result, "Audit write failures: {}", stats.audit_failure);
    }
    result
}

/// Recent messages of one channel, oldest first
///
/// Stays within Discord's message length; the oldest lines go first.
#[must_use]
pub fn format_history(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No messages seen in this channel yet".to_string();
    }

    let lines: Vec<String> = messages.iter().map(history_line).collect();

    // room for the "N earlier messages omitted" header
    let budget = MAX_CONTENT_CHARS - 40;
    let mut used = 0;
    let mut kept = 0;
    for line in lines.iter().rev() {
        let cost = line.chars().count() + 1;
        if used + cost > budget {
            break;
        }
        used += cost;
        kept += 1;
    }

    let mut result = String::new();
    let omitted = lines.len() - kept;
    if omitted > 0 {
        let _ = writeln!(result, "_{omitted} earlier messages omitted_");
    }
    for line in &lines[omitted..] {
        let _ = writeln!(result, "{line}");
    }
    result
}

fn history_line(message: &ChatMessage) -> String {
    let mut preview: String = message.text.chars().take(PREVIEW_CHARS).collect();
    if message.text.chars().count() > PREVIEW_CHARS {
        preview.push('…');
    }
    format!(
        "`{}` **{}**: {preview}",
        message.received_at.format("%H:%M:%S"),
        message.author
    )
}

/// Embed for the `automod status` command
#[must_use]
pub fn create_status_embed(
    config: &ModerationConfig,
    stats: &StatsSnapshot,
    limiter: &LimiterStatus,
    tracked_channels: usize,
) -> CreateEmbed {
    CreateEmbed::new()
        .title("Automod Status")
        .description(format!(
            "Mode: **{}**, sensitivity **{}**",
            mode_label(config),
            config.sensitivity
        ))
        .field("Budget", format_budget(limiter), true)
        .field("Channels", format!("{tracked_channels} tracked"), true)
        .field("Counters", format_counters(stats), false)
        .timestamp(serenity::Timestamp::now())
}
