//! Audit trail
//!
//! One [`ModAction`] per message that reached a decision and either did
//! nothing or had its action attempted. Records are append-only.

use crate::moderation::{ChatMessage, Decision, ExecutionResult, ModerationError, ModerationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A persisted moderation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModAction {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub trigger_message_id: String,
    pub trigger_author: String,
    pub trigger_content: String,
    pub model: String,
    pub reasoning: String,
    pub tool_name: String,
    pub tool_params: Value,
    pub target_user_id: Option<String>,
    pub api_response: Option<Value>,
    pub success: bool,
    pub error: Option<String>,
    pub channel_id: String,
    pub channel_name: String,
}

impl ModAction {
    /// Build the record for a decision; `result` is `None` for no-action decisions
    #[must_use]
    pub fn record(
        message: &ChatMessage,
        decision: &Decision,
        result: Option<&ExecutionResult>,
    ) -> Self {
        let (success, api_response, error, target_user_id) = match result {
            Some(result) => (
                result.success,
                result.raw_response.clone(),
                result.error.clone(),
                result
                    .target_user_id
                    .clone()
                    .or_else(|| decision.target_user_id.clone()),
            ),
            None => (true, None, None, decision.target_user_id.clone()),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            trigger_message_id: message.id.clone(),
            trigger_author: message.author.clone(),
            trigger_content: message.text.clone(),
            model: decision.model.clone(),
            reasoning: decision.reasoning.clone(),
            tool_name: decision.tool_name().as_str().to_string(),
            tool_params: Value::Object(decision.parameters.clone()),
            target_user_id,
            api_response,
            success,
            error,
            channel_id: message.channel.id.clone(),
            channel_name: message.channel.name.clone(),
        }
    }
}

/// Write-only durable store for audit records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a record, returning its id
    async fn append(&self, action: ModAction) -> ModerationResult<String>;
}

/// In-memory store, used in tests and when no audit file is configured
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: DashMap<String, ModAction>,
}

impl MemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first
    #[must_use]
    pub fn all(&self) -> Vec<ModAction> {
        let mut records: Vec<ModAction> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.created_at);
        records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, action: ModAction) -> ModerationResult<String> {
        let id = action.id.clone();
        self.records.insert(id.clone(), action);
        Ok(id)
    }
}

/// Append-only JSON lines file
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, action: ModAction) -> ModerationResult<String> {
        let mut line = serde_json::to_string(&action)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ModerationError::AuditWrite(format!("{}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ModerationError::AuditWrite(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| ModerationError::AuditWrite(e.to_string()))?;

        Ok(action.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::{ChannelRef, ToolCall};

    fn message() -> ChatMessage {
        ChatMessage::new(
            ChannelRef::new("100", "general"),
            "9001",
            "chatter42",
            "AAAAAAAAAAAAAAAAAAAA",
        )
    }

    fn timeout_decision() -> Decision {
        let (call, params) = ToolCall::parse(
            "timeout_user",
            r#"{"username":"chatter42","duration_seconds":120,"reason":"spam"}"#,
        )
        .unwrap();
        Decision::from_call(call, params, None, "test-model")
    }

    #[test]
    fn test_record_from_execution() {
        let decision = timeout_decision();
        let result = ExecutionResult {
            success: true,
            dry_run: false,
            raw_response: Some(serde_json::json!({ "ok": true })),
            target_user_id: Some("555".to_string()),
            error: None,
        };
        let record = ModAction::record(&message(), &decision, Some(&result));

        assert_eq!(record.tool_name, "timeout_user");
        assert_eq!(record.tool_params["duration_seconds"], 120);
        assert_eq!(record.target_user_id.as_deref(), Some("555"));
        assert_eq!(record.reasoning, "spam");
        assert_eq!(record.model, "test-model");
        assert_eq!(record.trigger_author, "chatter42");
        assert_eq!(record.channel_name, "general");
        assert!(record.success);
    }

    #[test]
    fn test_record_for_no_action() {
        let decision = Decision::no_action("all good", "test-model");
        let record = ModAction::record(&message(), &decision, None);
        assert_eq!(record.tool_name, "no_action");
        assert!(record.success);
        assert!(record.api_response.is_none());
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryAuditStore::new();
        assert!(store.is_empty());

        let decision = Decision::no_action("fine", "m");
        let first = ModAction::record(&message(), &decision, None);
        let id = store.append(first.clone()).await.unwrap();
        assert_eq!(id, first.id);

        let mut second = ModAction::record(&message(), &timeout_decision(), None);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        store.append(second).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[0].id, first.id);
    }

    #[tokio::test]
    async fn test_jsonl_store_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlAuditStore::new(dir.path().join("audit").join("actions.jsonl"));

        let a = ModAction::record(&message(), &Decision::no_action("fine", "m"), None);
        let b = ModAction::record(&message(), &timeout_decision(), None);
        store.append(a.clone()).await.unwrap();
        store.append(b.clone()).await.unwrap();

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        let lines: Vec<ModAction> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines, vec![a, b]);
    }
}
