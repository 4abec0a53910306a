//! Moderation tool taxonomy
//!
//! The fixed catalog of actions the oracle may select, each with a parameter
//! schema. Raw oracle tool calls are validated against that schema and turned
//! into a strictly typed [`ToolCall`] here, so handlers never see loose maps.

use crate::moderation::{ModerationError, ModerationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Longest timeout the enforcement API accepts (14 days)
pub const MAX_TIMEOUT_SECONDS: i64 = 1_209_600;

/// Name of a catalog tool; the string form is the wire contract with the oracle
///
/// [`ToolName::as_str`] is the only place the names are spelled out; display,
/// parsing and serde all go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ToolName {
    NoAction,
    WarnUser,
    TimeoutUser,
    BanUser,
    UnbanUser,
    DeleteMessage,
    ClearChat,
    EmoteOnlyMode,
    SubscriberOnlyMode,
    FollowerOnlyMode,
    SlowMode,
    AddModerator,
    RemoveModerator,
    AddVip,
    RemoveVip,
    CreatePoll,
    EndPoll,
    CreatePrediction,
    ResolvePrediction,
    CancelPrediction,
    SendAnnouncement,
    SendShoutout,
}

impl ToolName {
    /// Every tool in catalog order
    pub const ALL: [Self; 22] = [
        Self::NoAction,
        Self::WarnUser,
        Self::TimeoutUser,
        Self::BanUser,
        Self::UnbanUser,
        Self::DeleteMessage,
        Self::ClearChat,
        Self::EmoteOnlyMode,
        Self::SubscriberOnlyMode,
        Self::FollowerOnlyMode,
        Self::SlowMode,
        Self::AddModerator,
        Self::RemoveModerator,
        Self::AddVip,
        Self::RemoveVip,
        Self::CreatePoll,
        Self::EndPoll,
        Self::CreatePrediction,
        Self::ResolvePrediction,
        Self::CancelPrediction,
        Self::SendAnnouncement,
        Self::SendShoutout,
    ];

    /// Wire name of the tool
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoAction => "no_action",
            Self::WarnUser => "warn_user",
            Self::TimeoutUser => "timeout_user",
            Self::BanUser => "ban_user",
            Self::UnbanUser => "unban_user",
            Self::DeleteMessage => "delete_message",
            Self::ClearChat => "clear_chat",
            Self::EmoteOnlyMode => "emote_only_mode",
            Self::SubscriberOnlyMode => "subscriber_only_mode",
            Self::FollowerOnlyMode => "follower_only_mode",
            Self::SlowMode => "slow_mode",
            Self::AddModerator => "add_moderator",
            Self::RemoveModerator => "remove_moderator",
            Self::AddVip => "add_vip",
            Self::RemoveVip => "remove_vip",
            Self::CreatePoll => "create_poll",
            Self::EndPoll => "end_poll",
            Self::CreatePrediction => "create_prediction",
            Self::ResolvePrediction => "resolve_prediction",
            Self::CancelPrediction => "cancel_prediction",
            Self::SendAnnouncement => "send_announcement",
            Self::SendShoutout => "send_shoutout",
        }
    }

    /// Tools that need broadcaster-level privilege and are left out of the core set
    #[must_use]
    pub fn is_elevated(self) -> bool {
        matches!(
            self,
            Self::AddModerator
                | Self::RemoveModerator
                | Self::AddVip
                | Self::RemoveVip
                | Self::CreatePoll
                | Self::EndPoll
                | Self::CreatePrediction
                | Self::ResolvePrediction
                | Self::CancelPrediction
                | Self::SendAnnouncement
                | Self::SendShoutout
        )
    }

    /// Catalog entry for this tool
    #[must_use]
    pub fn tool(self) -> &'static Tool {
        // CATALOG is declared in ALL order
        &CATALOG[self as usize]
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ToolName> for &'static str {
    fn from(name: ToolName) -> Self {
        name.as_str()
    }
}

impl TryFrom<String> for ToolName {
    type Error = ModerationError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl FromStr for ToolName {
    type Err = ModerationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == name)
            .ok_or_else(|| ModerationError::UnknownTool(name.to_string()))
    }
}

/// Type and bounds of a single tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text { max_len: Option<usize> },
    Integer { min: i64, max: i64 },
    Boolean,
    TextList {
        min_items: usize,
        max_items: usize,
        max_len: usize,
    },
    Choice(&'static [&'static str]),
}

/// A named parameter in a tool's schema
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

const fn required(name: &'static str, description: &'static str, kind: ParamKind) -> Param {
    Param {
        name,
        description,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, description: &'static str, kind: ParamKind) -> Param {
    Param {
        name,
        description,
        kind,
        required: false,
    }
}

const TEXT: ParamKind = ParamKind::Text { max_len: None };
const REASON: Param = optional("reason", "Short explanation of why this action is taken", TEXT);
const USERNAME: Param = required("username", "Chat username of the target user", TEXT);
const ENABLED: Param = required(
    "enabled",
    "true to turn the mode on, false to turn it off",
    ParamKind::Boolean,
);

/// A catalog entry: name, description and parameter schema
#[derive(Debug)]
pub struct Tool {
    pub name: ToolName,
    pub description: &'static str,
    pub params: &'static [Param],
}

/// The full catalog, in [`ToolName::ALL`] order
pub static CATALOG: [Tool; 22] = [
    Tool {
        name: ToolName::NoAction,
        description: "Take no moderation action. Use this when the message is acceptable.",
        params: &[REASON],
    },
    Tool {
        name: ToolName::WarnUser,
        description: "Post a public warning to a user in chat.",
        params: &[
            USERNAME,
            required(
                "message",
                "Warning text shown to the user",
                ParamKind::Text { max_len: Some(500) },
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::TimeoutUser,
        description: "Temporarily prevent a user from chatting.",
        params: &[
            USERNAME,
            optional(
                "duration_seconds",
                "Timeout length in seconds (default 60)",
                ParamKind::Integer {
                    min: 1,
                    max: MAX_TIMEOUT_SECONDS,
                },
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::BanUser,
        description: "Permanently ban a user from the channel.",
        params: &[USERNAME, REASON],
    },
    Tool {
        name: ToolName::UnbanUser,
        description: "Lift a ban or timeout on a user.",
        params: &[USERNAME, REASON],
    },
    Tool {
        name: ToolName::DeleteMessage,
        description: "Delete a single chat message (defaults to the message being evaluated).",
        params: &[
            optional("message_id", "Id of the message to delete", TEXT),
            REASON,
        ],
    },
    Tool {
        name: ToolName::ClearChat,
        description: "Remove all messages from chat.",
        params: &[REASON],
    },
    Tool {
        name: ToolName::EmoteOnlyMode,
        description: "Restrict chat to emote-only messages.",
        params: &[ENABLED, REASON],
    },
    Tool {
        name: ToolName::SubscriberOnlyMode,
        description: "Restrict chat to subscribers.",
        params: &[ENABLED, REASON],
    },
    Tool {
        name: ToolName::FollowerOnlyMode,
        description: "Restrict chat to followers, optionally of a minimum age.",
        params: &[
            ENABLED,
            optional(
                "duration_minutes",
                "Minimum follow age in minutes (default 0)",
                ParamKind::Integer { min: 0, max: 129_600 },
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::SlowMode,
        description: "Require users to wait between messages.",
        params: &[
            ENABLED,
            optional(
                "wait_seconds",
                "Seconds between messages (default 30)",
                ParamKind::Integer { min: 3, max: 120 },
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::AddModerator,
        description: "Grant moderator status to a user.",
        params: &[USERNAME, REASON],
    },
    Tool {
        name: ToolName::RemoveModerator,
        description: "Revoke moderator status from a user.",
        params: &[USERNAME, REASON],
    },
    Tool {
        name: ToolName::AddVip,
        description: "Grant VIP status to a user.",
        params: &[USERNAME, REASON],
    },
    Tool {
        name: ToolName::RemoveVip,
        description: "Revoke VIP status from a user.",
        params: &[USERNAME, REASON],
    },
    Tool {
        name: ToolName::CreatePoll,
        description: "Start a chat poll.",
        params: &[
            required(
                "title",
                "Poll question",
                ParamKind::Text { max_len: Some(60) },
            ),
            required(
                "choices",
                "Between 2 and 5 answers",
                ParamKind::TextList {
                    min_items: 2,
                    max_items: 5,
                    max_len: 25,
                },
            ),
            optional(
                "duration_seconds",
                "How long the poll runs (default 60)",
                ParamKind::Integer { min: 15, max: 1800 },
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::EndPoll,
        description: "End a running poll.",
        params: &[
            required("poll_id", "Id of the poll", TEXT),
            optional(
                "archive",
                "Hide the results instead of showing them",
                ParamKind::Boolean,
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::CreatePrediction,
        description: "Start a channel-points prediction.",
        params: &[
            required(
                "title",
                "Prediction question",
                ParamKind::Text { max_len: Some(45) },
            ),
            required(
                "outcomes",
                "Between 2 and 10 outcomes",
                ParamKind::TextList {
                    min_items: 2,
                    max_items: 10,
                    max_len: 25,
                },
            ),
            optional(
                "prediction_window_seconds",
                "How long viewers can predict (default 120)",
                ParamKind::Integer { min: 30, max: 1800 },
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::ResolvePrediction,
        description: "Pay out a prediction to the winning outcome.",
        params: &[
            required("prediction_id", "Id of the prediction", TEXT),
            required("winning_outcome_id", "Id of the winning outcome", TEXT),
            REASON,
        ],
    },
    Tool {
        name: ToolName::CancelPrediction,
        description: "Cancel a prediction and refund all points.",
        params: &[
            required("prediction_id", "Id of the prediction", TEXT),
            REASON,
        ],
    },
    Tool {
        name: ToolName::SendAnnouncement,
        description: "Post a highlighted announcement in chat.",
        params: &[
            required(
                "message",
                "Announcement text",
                ParamKind::Text { max_len: Some(500) },
            ),
            optional(
                "color",
                "Highlight color (default primary)",
                ParamKind::Choice(&["blue", "green", "orange", "purple", "primary"]),
            ),
            REASON,
        ],
    },
    Tool {
        name: ToolName::SendShoutout,
        description: "Give another streamer a shoutout.",
        params: &[USERNAME, REASON],
    },
];

impl Tool {
    /// JSON schema of this tool's arguments, as advertised to the oracle
    #[must_use]
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.params {
            let mut property = match param.kind {
                ParamKind::Text { max_len } => {
                    let mut p = json!({ "type": "string" });
                    if let Some(max) = max_len {
                        p["maxLength"] = json!(max);
                    }
                    p
                }
                ParamKind::Integer { min, max } => {
                    json!({ "type": "integer", "minimum": min, "maximum": max })
                }
                ParamKind::Boolean => json!({ "type": "boolean" }),
                ParamKind::TextList {
                    min_items,
                    max_items,
                    max_len,
                } => json!({
                    "type": "array",
                    "items": { "type": "string", "maxLength": max_len },
                    "minItems": min_items,
                    "maxItems": max_items,
                }),
                ParamKind::Choice(values) => json!({ "type": "string", "enum": values }),
            };
            property["description"] = json!(param.description);
            properties.insert(param.name.to_string(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check an argument map against this tool's schema
    ///
    /// # Errors
    ///
    /// Returns `MalformedToolCall` naming the first offending parameter.
    pub fn validate(&self, args: &Map<String, Value>) -> ModerationResult<()> {
        let tool = self.name.as_str();
        for param in self.params {
            let value = match args.get(param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ModerationError::malformed(
                        tool,
                        format!("missing required parameter '{}'", param.name),
                    ));
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            check_param(param, value).map_err(|reason| {
                ModerationError::malformed(tool, format!("parameter '{}' {reason}", param.name))
            })?;
        }
        Ok(())
    }
}

fn check_param(param: &Param, value: &Value) -> Result<(), String> {
    match param.kind {
        ParamKind::Text { max_len } => {
            let text = value.as_str().ok_or("must be a string")?;
            if let Some(max) = max_len {
                if text.chars().count() > max {
                    return Err(format!("must be at most {max} characters"));
                }
            }
        }
        ParamKind::Integer { min, max } => {
            let number = value.as_i64().ok_or("must be an integer")?;
            if !(min..=max).contains(&number) {
                return Err(format!("must be between {min} and {max}"));
            }
        }
        ParamKind::Boolean => {
            value.as_bool().ok_or("must be a boolean")?;
        }
        ParamKind::TextList {
            min_items,
            max_items,
            max_len,
        } => {
            let items = value.as_array().ok_or("must be a list of strings")?;
            if items.len() < min_items || items.len() > max_items {
                return Err(format!("must have between {min_items} and {max_items} items"));
            }
            for item in items {
                let text = item.as_str().ok_or("must be a list of strings")?;
                if text.chars().count() > max_len {
                    return Err(format!("items must be at most {max_len} characters"));
                }
            }
        }
        ParamKind::Choice(values) => {
            let text = value.as_str().ok_or("must be a string")?;
            if !values.contains(&text) {
                return Err(format!("must be one of {}", values.join(", ")));
            }
        }
    }
    Ok(())
}

/// Every declared tool
#[must_use]
pub fn catalog() -> &'static [Tool] {
    &CATALOG
}

/// Tools that need no elevated privilege
pub fn core_tools() -> impl Iterator<Item = &'static Tool> {
    CATALOG.iter().filter(|tool| !tool.name.is_elevated())
}

/// Whether `name` is a catalog tool
#[must_use]
pub fn is_known_tool(name: &str) -> bool {
    name.parse::<ToolName>().is_ok()
}

/// The vocabulary offered to the oracle
///
/// The allow-list (empty means everything) is filtered against the core set,
/// or the whole catalog when `include_elevated` is set. `no_action` is always
/// present.
#[must_use]
pub fn allowed_tools(allow_list: &[String], include_elevated: bool) -> Vec<&'static Tool> {
    let mut tools: Vec<&'static Tool> = CATALOG
        .iter()
        .filter(|tool| include_elevated || !tool.name.is_elevated())
        .filter(|tool| {
            allow_list.is_empty() || allow_list.iter().any(|name| name == tool.name.as_str())
        })
        .collect();

    if !tools.iter().any(|tool| tool.name == ToolName::NoAction) {
        tools.insert(0, ToolName::NoAction.tool());
    }
    tools
}

/// Parse a raw JSON argument string into a generic map
///
/// An empty (or whitespace-only) string yields an empty map.
///
/// # Errors
///
/// Returns `MalformedToolCall` if the string is not a JSON object.
pub fn parse_tool_arguments(tool: &str, raw: &str) -> ModerationResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ModerationError::malformed(
            tool,
            format!("arguments must be a JSON object, got {other}"),
        )),
        Err(e) => Err(ModerationError::malformed(tool, e.to_string())),
    }
}

/// Arguments carrying only an optional reason
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ReasonArgs {
    pub reason: Option<String>,
}

/// Arguments targeting a single user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserArgs {
    pub username: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WarnArgs {
    pub username: String,
    pub message: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeoutArgs {
    pub username: String,
    pub duration_seconds: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteMessageArgs {
    pub message_id: Option<String>,
    pub reason: Option<String>,
}

/// Arguments for the on/off chat modes
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToggleArgs {
    pub enabled: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FollowerModeArgs {
    pub enabled: bool,
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlowModeArgs {
    pub enabled: bool,
    pub wait_seconds: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PollArgs {
    pub title: String,
    pub choices: Vec<String>,
    pub duration_seconds: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndPollArgs {
    pub poll_id: String,
    pub archive: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionArgs {
    pub title: String,
    pub outcomes: Vec<String>,
    pub prediction_window_seconds: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolvePredictionArgs {
    pub prediction_id: String,
    pub winning_outcome_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CancelPredictionArgs {
    pub prediction_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnouncementArgs {
    pub message: String,
    pub color: Option<String>,
    pub reason: Option<String>,
}

/// A validated tool selection, one variant per catalog tool
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    NoAction(ReasonArgs),
    WarnUser(WarnArgs),
    TimeoutUser(TimeoutArgs),
    BanUser(UserArgs),
    UnbanUser(UserArgs),
    DeleteMessage(DeleteMessageArgs),
    ClearChat(ReasonArgs),
    EmoteOnlyMode(ToggleArgs),
    SubscriberOnlyMode(ToggleArgs),
    FollowerOnlyMode(FollowerModeArgs),
    SlowMode(SlowModeArgs),
    AddModerator(UserArgs),
    RemoveModerator(UserArgs),
    AddVip(UserArgs),
    RemoveVip(UserArgs),
    CreatePoll(PollArgs),
    EndPoll(EndPollArgs),
    CreatePrediction(PredictionArgs),
    ResolvePrediction(ResolvePredictionArgs),
    CancelPrediction(CancelPredictionArgs),
    SendAnnouncement(AnnouncementArgs),
    SendShoutout(UserArgs),
}

impl Default for ToolCall {
    fn default() -> Self {
        Self::NoAction(ReasonArgs::default())
    }
}

impl ToolCall {
    /// Parse a raw oracle tool call (name + JSON argument string)
    ///
    /// Returns the typed call together with the raw argument map, which the
    /// audit trail keeps as-is.
    ///
    /// # Errors
    ///
    /// `UnknownTool` for a name outside the catalog, `MalformedToolCall` for
    /// invalid JSON or arguments that violate the tool's schema.
    pub fn parse(name: &str, raw_arguments: &str) -> ModerationResult<(Self, Map<String, Value>)> {
        let tool_name: ToolName = name.parse()?;
        let args = parse_tool_arguments(name, raw_arguments)?;
        let call = Self::from_arguments(tool_name, &args)?;
        Ok((call, args))
    }

    /// Build a typed call from an already-decoded argument map
    ///
    /// # Errors
    ///
    /// Returns `MalformedToolCall` if the map violates the tool's schema.
    pub fn from_arguments(name: ToolName, args: &Map<String, Value>) -> ModerationResult<Self> {
        name.tool().validate(args)?;

        // Drop nulls so optional fields fall back to None
        let arguments: Map<String, Value> = args
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        serde_json::from_value(json!({ "tool": name.as_str(), "arguments": arguments }))
            .map_err(|e| ModerationError::malformed(name.as_str(), e.to_string()))
    }

    /// Catalog name of this call
    #[must_use]
    pub fn name(&self) -> ToolName {
        match self {
            Self::NoAction(_) => ToolName::NoAction,
            Self::WarnUser(_) => ToolName::WarnUser,
            Self::TimeoutUser(_) => ToolName::TimeoutUser,
            Self::BanUser(_) => ToolName::BanUser,
            Self::UnbanUser(_) => ToolName::UnbanUser,
            Self::DeleteMessage(_) => ToolName::DeleteMessage,
            Self::ClearChat(_) => ToolName::ClearChat,
            Self::EmoteOnlyMode(_) => ToolName::EmoteOnlyMode,
            Self::SubscriberOnlyMode(_) => ToolName::SubscriberOnlyMode,
            Self::FollowerOnlyMode(_) => ToolName::FollowerOnlyMode,
            Self::SlowMode(_) => ToolName::SlowMode,
            Self::AddModerator(_) => ToolName::AddModerator,
            Self::RemoveModerator(_) => ToolName::RemoveModerator,
            Self::AddVip(_) => ToolName::AddVip,
            Self::RemoveVip(_) => ToolName::RemoveVip,
            Self::CreatePoll(_) => ToolName::CreatePoll,
            Self::EndPoll(_) => ToolName::EndPoll,
            Self::CreatePrediction(_) => ToolName::CreatePrediction,
            Self::ResolvePrediction(_) => ToolName::ResolvePrediction,
            Self::CancelPrediction(_) => ToolName::CancelPrediction,
            Self::SendAnnouncement(_) => ToolName::SendAnnouncement,
            Self::SendShoutout(_) => ToolName::SendShoutout,
        }
    }

    /// The `reason` argument, if the oracle gave one
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        let reason = match self {
            Self::NoAction(args) | Self::ClearChat(args) => &args.reason,
            Self::WarnUser(args) => &args.reason,
            Self::TimeoutUser(args) => &args.reason,
            Self::BanUser(args)
            | Self::UnbanUser(args)
            | Self::AddModerator(args)
            | Self::RemoveModerator(args)
            | Self::AddVip(args)
            | Self::RemoveVip(args)
            | Self::SendShoutout(args) => &args.reason,
            Self::DeleteMessage(args) => &args.reason,
            Self::EmoteOnlyMode(args) | Self::SubscriberOnlyMode(args) => &args.reason,
            Self::FollowerOnlyMode(args) => &args.reason,
            Self::SlowMode(args) => &args.reason,
            Self::CreatePoll(args) => &args.reason,
            Self::EndPoll(args) => &args.reason,
            Self::CreatePrediction(args) => &args.reason,
            Self::ResolvePrediction(args) => &args.reason,
            Self::CancelPrediction(args) => &args.reason,
            Self::SendAnnouncement(args) => &args.reason,
        };
        reason.as_deref()
    }

    /// Username this call acts on, if any
    #[must_use]
    pub fn target_username(&self) -> Option<&str> {
        match self {
            Self::WarnUser(args) => Some(args.username.as_str()),
            Self::TimeoutUser(args) => Some(args.username.as_str()),
            Self::BanUser(args)
            | Self::UnbanUser(args)
            | Self::AddModerator(args)
            | Self::RemoveModerator(args)
            | Self::AddVip(args)
            | Self::RemoveVip(args)
            | Self::SendShoutout(args) => Some(args.username.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_names() {
        assert_eq!(CATALOG.len(), ToolName::ALL.len());
        for (tool, name) in CATALOG.iter().zip(ToolName::ALL) {
            assert_eq!(tool.name, name);
            assert_eq!(name.tool().name, name);
        }
    }

    #[test]
    fn test_is_known_tool_covers_exactly_the_catalog() {
        for tool in catalog() {
            assert!(is_known_tool(tool.name.as_str()));
            assert_eq!(tool.name.to_string(), tool.name.as_str());
        }
        assert!(!is_known_tool("summon_daemon"));
        assert!(!is_known_tool("Ban_User"));
        assert!(!is_known_tool(""));
    }

    #[test]
    fn test_tool_name_serde_uses_wire_name() {
        for name in ToolName::ALL {
            let encoded = serde_json::to_value(name).unwrap();
            assert_eq!(encoded, Value::String(name.as_str().to_string()));
            let decoded: ToolName = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, name);
        }
        assert!(serde_json::from_str::<ToolName>("\"summon_daemon\"").is_err());
    }

    #[test]
    fn test_core_tools_exclude_elevated() {
        let core: Vec<ToolName> = core_tools().map(|t| t.name).collect();
        assert_eq!(core.len(), 11);
        assert!(core.contains(&ToolName::SlowMode));
        assert!(!core.contains(&ToolName::CreatePoll));
        assert!(!core.contains(&ToolName::SendAnnouncement));
        assert!(!core.contains(&ToolName::AddModerator));
    }

    #[test]
    fn test_allowed_tools_forces_no_action() {
        let allow = vec!["warn_user".to_string(), "ban_user".to_string()];
        let names: Vec<ToolName> = allowed_tools(&allow, false).iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![ToolName::NoAction, ToolName::WarnUser, ToolName::BanUser]
        );

        // Empty allow-list offers the whole core set
        assert_eq!(allowed_tools(&[], false).len(), 11);
        assert_eq!(allowed_tools(&[], true).len(), 22);

        // Elevated names are filtered out unless elevated tools are enabled
        let allow = vec!["create_poll".to_string()];
        let names: Vec<ToolName> = allowed_tools(&allow, false).iter().map(|t| t.name).collect();
        assert_eq!(names, vec![ToolName::NoAction]);
        let names: Vec<ToolName> = allowed_tools(&allow, true).iter().map(|t| t.name).collect();
        assert_eq!(names, vec![ToolName::NoAction, ToolName::CreatePoll]);
    }

    #[test]
    fn test_parse_tool_arguments() {
        assert!(parse_tool_arguments("clear_chat", "").unwrap().is_empty());
        assert!(parse_tool_arguments("clear_chat", "  ").unwrap().is_empty());

        let args = parse_tool_arguments("ban_user", r#"{"username":"troll"}"#).unwrap();
        assert_eq!(args["username"], "troll");

        let err = parse_tool_arguments("ban_user", "{username: troll").unwrap_err();
        assert!(matches!(err, ModerationError::MalformedToolCall { .. }));

        let err = parse_tool_arguments("ban_user", "[1, 2]").unwrap_err();
        assert!(matches!(err, ModerationError::MalformedToolCall { .. }));
    }

    #[test]
    fn test_parse_typed_timeout() {
        let (call, raw) = ToolCall::parse(
            "timeout_user",
            r#"{"username":"chatter42","duration_seconds":120,"reason":"spam"}"#,
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::TimeoutUser(TimeoutArgs {
                username: "chatter42".to_string(),
                duration_seconds: Some(120),
                reason: Some("spam".to_string()),
            })
        );
        assert_eq!(call.name(), ToolName::TimeoutUser);
        assert_eq!(call.reason(), Some("spam"));
        assert_eq!(call.target_username(), Some("chatter42"));
        assert_eq!(raw["duration_seconds"], 120);
    }

    #[test]
    fn test_parse_empty_arguments() {
        let (call, raw) = ToolCall::parse("clear_chat", "").unwrap();
        assert_eq!(call, ToolCall::ClearChat(ReasonArgs { reason: None }));
        assert!(raw.is_empty());

        let (call, _) = ToolCall::parse("no_action", "").unwrap();
        assert_eq!(call, ToolCall::default());
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let err = ToolCall::parse("summon_daemon", "{}").unwrap_err();
        assert!(matches!(err, ModerationError::UnknownTool(name) if name == "summon_daemon"));
    }

    #[test]
    fn test_schema_violations_are_malformed() {
        let cases = [
            ("timeout_user", r#"{"duration_seconds":60}"#),
            ("timeout_user", r#"{"username":"a","duration_seconds":0}"#),
            ("timeout_user", r#"{"username":"a","duration_seconds":1209601}"#),
            ("timeout_user", r#"{"username":"a","duration_seconds":"60"}"#),
            ("slow_mode", r#"{"enabled":true,"wait_seconds":2}"#),
            ("slow_mode", r#"{"enabled":true,"wait_seconds":121}"#),
            ("slow_mode", r#"{"wait_seconds":30}"#),
            ("create_poll", r#"{"title":"Best?","choices":["one"]}"#),
            (
                "create_poll",
                r#"{"title":"Best?","choices":["a","b","c","d","e","f"]}"#,
            ),
            (
                "create_poll",
                r#"{"title":"Best?","choices":["a","this choice is far too long to fit"]}"#,
            ),
            ("send_announcement", r#"{"message":"hi","color":"red"}"#),
            ("warn_user", r#"{"username":"a","message":null}"#),
        ];
        for (tool, args) in cases {
            let err = ToolCall::parse(tool, args).unwrap_err();
            assert!(
                matches!(err, ModerationError::MalformedToolCall { .. }),
                "{tool} {args} should be malformed, got {err}"
            );
        }
    }

    #[test]
    fn test_schema_bounds_accept_edges() {
        assert!(ToolCall::parse("timeout_user", r#"{"username":"a","duration_seconds":1}"#).is_ok());
        assert!(
            ToolCall::parse("timeout_user", r#"{"username":"a","duration_seconds":1209600}"#)
                .is_ok()
        );
        assert!(ToolCall::parse("slow_mode", r#"{"enabled":true,"wait_seconds":3}"#).is_ok());
        assert!(ToolCall::parse("slow_mode", r#"{"enabled":true,"wait_seconds":120}"#).is_ok());
        assert!(
            ToolCall::parse(
                "create_poll",
                r#"{"title":"Best?","choices":["a","b","c","d","e"]}"#
            )
            .is_ok()
        );
    }

    #[test]
    fn test_null_optional_is_absent() {
        let (call, _) =
            ToolCall::parse("ban_user", r#"{"username":"troll","reason":null}"#).unwrap();
        assert_eq!(
            call,
            ToolCall::BanUser(UserArgs {
                username: "troll".to_string(),
                reason: None,
            })
        );
    }

    #[test]
    fn test_schema_rendering() {
        let schema = ToolName::TimeoutUser.tool().schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["username"]));
        assert_eq!(schema["properties"]["duration_seconds"]["minimum"], 1);
        assert_eq!(
            schema["properties"]["duration_seconds"]["maximum"],
            MAX_TIMEOUT_SECONDS
        );

        let schema = ToolName::SendAnnouncement.tool().schema();
        assert_eq!(schema["properties"]["color"]["enum"][4], "primary");
    }
}
