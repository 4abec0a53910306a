pub mod commands;
pub mod config;
pub mod data;
pub mod discord;
pub mod handlers;
pub mod logging;
pub mod moderation;
pub mod status;

pub const BOT_NAME: &str = "dastardly_automod";
pub const COMMAND_TARGET: &str = "dastardly_automod::command";
pub const ERROR_TARGET: &str = "dastardly_automod::error";
pub const EVENT_TARGET: &str = "dastardly_automod::handlers";
pub const MONITOR_TARGET: &str = "dastardly_automod::monitor";
pub const AUDIT_TARGET: &str = "dastardly_automod::audit";
pub const CONSOLE_TARGET: &str = "dastardly_automod";

pub use config::{BotConfig, ModerationConfig};
pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
