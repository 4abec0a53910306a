//! Bot configuration
//!
//! Loaded once at startup from a YAML file. Every field has a default, so a
//! missing or partial file still yields a usable configuration.

use crate::moderation::tools::is_known_tool;
use crate::moderation::{ChannelRef, ModerationError, ModerationResult};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Config file used when `AUTOMOD_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "data/automod.yaml";
/// Environment variable overriding the config path
pub const CONFIG_PATH_ENV: &str = "AUTOMOD_CONFIG";

/// How eager the oracle should be; passed through to its instructions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    #[display("conservative")]
    Conservative,
    #[default]
    #[display("moderate")]
    Moderate,
    #[display("aggressive")]
    Aggressive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Admission budget per one-minute window
    pub actions_per_minute: u32,
    // Not enforced
    pub bans_per_hour: u32,
    pub timeouts_per_user_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            actions_per_minute: 10,
            bans_per_hour: 5,
            timeouts_per_user_per_hour: 3,
        }
    }
}

/// Escalation thresholds; parsed and kept, not acted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub warnings_before_timeout: u32,
    pub timeouts_before_ban: u32,
    pub timeout_multiplier: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            warnings_before_timeout: 2,
            timeouts_before_ban: 3,
            timeout_multiplier: 2.0,
        }
    }
}

/// Moderation settings consumed by the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub enabled: bool,
    /// Channel ids or names to moderate; empty means all
    pub channels: Vec<String>,
    pub sensitivity: Sensitivity,
    /// Tools the dispatcher may run; empty means all
    pub allowed_tools: Vec<String>,
    /// Offer elevated tools (polls, predictions, roles...) to the oracle
    pub allow_elevated_tools: bool,
    pub rate_limits: RateLimitConfig,
    /// Free-text rules given to the oracle
    pub channel_rules: Vec<String>,
    pub dry_run: bool,
    pub escalation: EscalationConfig,
    /// Extra usernames never moderated, on top of the known bots
    pub skip_users: Vec<String>,
    pub owner_username: Option<String>,
    pub history_size: usize,
    pub queue_capacity: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: Vec::new(),
            sensitivity: Sensitivity::default(),
            allowed_tools: Vec::new(),
            allow_elevated_tools: false,
            rate_limits: RateLimitConfig::default(),
            channel_rules: Vec::new(),
            dry_run: false,
            escalation: EscalationConfig::default(),
            skip_users: Vec::new(),
            owner_username: None,
            history_size: 20,
            queue_capacity: 100,
        }
    }
}

impl ModerationConfig {
    /// Whether the dispatcher may run `name`
    #[must_use]
    pub fn is_tool_allowed(&self, name: &str) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.iter().any(|tool| tool == name)
    }

    /// Whether messages from `channel` are moderated at all
    #[must_use]
    pub fn is_channel_moderated(&self, channel: &ChannelRef) -> bool {
        self.channels.is_empty()
            || self.channels.iter().any(|entry| {
                entry == &channel.id
                    || entry
                        .trim_start_matches('#')
                        .eq_ignore_ascii_case(&channel.name)
            })
    }

    /// Check values the monitor cannot run with
    ///
    /// # Errors
    ///
    /// Returns `Config` for a zero action budget, history size or queue capacity.
    pub fn validate(&self) -> ModerationResult<()> {
        if self.rate_limits.actions_per_minute == 0 {
            return Err(ModerationError::Config(
                "rate_limits.actions_per_minute must be at least 1".to_string(),
            ));
        }
        if self.history_size == 0 {
            return Err(ModerationError::Config(
                "history_size must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ModerationError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        for name in self.allowed_tools.iter().filter(|name| !is_known_tool(name)) {
            warn!(tool = %name, "allowed_tools names an unknown tool, ignoring it");
        }
        Ok(())
    }
}

/// Oracle endpoint settings; the API key itself comes from the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the env var holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 300,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON lines file; `None` keeps records in memory only
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: Some("data/mod_actions.jsonl".to_string()),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub moderation: ModerationConfig,
    pub oracle: OracleConfig,
    pub audit: AuditConfig,
}

impl BotConfig {
    /// Path from `AUTOMOD_CONFIG`, else the default
    #[must_use]
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Parse and validate YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or fails validation.
    pub fn from_yaml(text: &str) -> ModerationResult<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.moderation.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails validation.
    pub async fn load(path: impl AsRef<Path>) -> ModerationResult<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let config = Self::from_yaml(&text)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModerationConfig::default();
        assert!(config.enabled);
        assert!(!config.dry_run);
        assert_eq!(config.rate_limits.actions_per_minute, 10);
        assert_eq!(config.history_size, 20);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.sensitivity, Sensitivity::Moderate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tool_allow_list() {
        let open = ModerationConfig::default();
        for name in ["ban_user", "no_action", "anything_at_all"] {
            assert!(open.is_tool_allowed(name));
        }

        let closed = ModerationConfig {
            allowed_tools: vec!["no_action".to_string(), "warn_user".to_string()],
            ..ModerationConfig::default()
        };
        assert!(closed.is_tool_allowed("warn_user"));
        assert!(!closed.is_tool_allowed("ban_user"));
        // verbatim match only
        assert!(!closed.is_tool_allowed("Warn_User"));
    }

    #[test]
    fn test_channel_filter() {
        let general = ChannelRef::new("100", "general");
        assert!(ModerationConfig::default().is_channel_moderated(&general));

        let config = ModerationConfig {
            channels: vec!["#General".to_string(), "200".to_string()],
            ..ModerationConfig::default()
        };
        assert!(config.is_channel_moderated(&general));
        assert!(config.is_channel_moderated(&ChannelRef::new("200", "memes")));
        assert!(!config.is_channel_moderated(&ChannelRef::new("300", "memes")));
    }

    #[test]
    fn test_partial_yaml() {
        let config = BotConfig::from_yaml(
            r"
moderation:
  sensitivity: aggressive
  dry_run: true
  allowed_tools: [no_action, timeout_user]
  rate_limits:
    actions_per_minute: 3
  channel_rules:
    - No links
oracle:
  model: local-model
",
        )
        .unwrap();

        assert_eq!(config.moderation.sensitivity, Sensitivity::Aggressive);
        assert!(config.moderation.dry_run);
        assert_eq!(config.moderation.rate_limits.actions_per_minute, 3);
        assert_eq!(config.moderation.rate_limits.bans_per_hour, 5);
        assert_eq!(config.moderation.channel_rules, vec!["No links"]);
        assert_eq!(config.moderation.history_size, 20);
        assert_eq!(config.oracle.model, "local-model");
        assert_eq!(config.oracle.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.audit, AuditConfig::default());

        assert_eq!(BotConfig::from_yaml("").unwrap(), BotConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let err = BotConfig::from_yaml("moderation:\n  rate_limits:\n    actions_per_minute: 0\n")
            .unwrap_err();
        assert!(matches!(err, ModerationError::Config(_)));

        let config = ModerationConfig {
            queue_capacity: 0,
            ..ModerationConfig::default()
        };
        assert!(config.validate().is_err());

        // unknown tools only warn
        let config = ModerationConfig {
            allowed_tools: vec!["summon_daemon".to_string()],
            ..ModerationConfig::default()
        };
        assert!(config.validate().is_ok());

        assert!(matches!(
            BotConfig::from_yaml("moderation: [not, a, map]"),
            Err(ModerationError::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automod.yaml");

        // missing file falls back to defaults
        let config = BotConfig::load(&path).await.unwrap();
        assert_eq!(config, BotConfig::default());

        tokio::fs::write(&path, "moderation:\n  enabled: false\n  owner_username: TheStreamer\n")
            .await
            .unwrap();
        let config = BotConfig::load(&path).await.unwrap();
        assert!(!config.moderation.enabled);
        assert_eq!(config.moderation.owner_username.as_deref(), Some("TheStreamer"));
    }
}
