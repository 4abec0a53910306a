//! Monitor
//!
//! Owns the intake queue and the single consumer task that runs each message
//! through the pipeline: skip-list, history, quick filter, decision,
//! admission, dispatch, audit. Only one message is in flight at a time.

use crate::config::ModerationConfig;
use crate::moderation::tools::allowed_tools;
use crate::moderation::{
    ActionDispatcher, AuditStore, ChatMessage, ChatTransport, Counter, DecisionEngine,
    DenialReason, Enforcement, EvaluationContext, ExecutionResult, HistoryBuffer,
    IdentityResolver, LimiterStatus, MetricsSink, ModAction, ModerationError, Oracle, RateLimiter,
    SkipList, Tool, needs_evaluation,
};
use crate::{AUDIT_TARGET, MONITOR_TARGET};
use dashmap::DashMap;
use derive_more::Display;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a message was ignored before it touched any state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DropReason {
    #[display("disabled")]
    Disabled,
    #[display("unmoderated channel")]
    UnmoderatedChannel,
    #[display("skipped user")]
    SkippedUser,
}

/// Terminal state of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Dropped(DropReason),
    FilteredOut,
    EvaluationFailed,
    NoAction,
    Denied(DenialReason),
    DryRun,
    Executed { success: bool },
}

/// External collaborators the monitor is built from
pub struct MonitorParts {
    pub oracle: Arc<dyn Oracle>,
    pub enforcement: Arc<dyn Enforcement>,
    pub identity: Arc<dyn IdentityResolver>,
    pub chat: Arc<dyn ChatTransport>,
    pub audit: Arc<dyn AuditStore>,
    pub metrics: Arc<dyn MetricsSink>,
}

type Histories = Arc<DashMap<String, Arc<HistoryBuffer>>>;

/// Producer handle for the intake queue
#[derive(Clone)]
pub struct IntakeSender {
    tx: Sender<ChatMessage>,
    metrics: Arc<dyn MetricsSink>,
}

impl IntakeSender {
    /// Enqueue without waiting; returns false if the message was dropped
    pub fn submit(&self, message: ChatMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(
                    target: MONITOR_TARGET,
                    event = "intake_dropped",
                    message_id = %message.id,
                    "Intake queue full, dropping message"
                );
                self.metrics.incr(Counter::IntakeDropped);
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(
                    target: MONITOR_TARGET,
                    event = "intake_dropped",
                    message_id = %message.id,
                    "Monitor stopped, dropping message"
                );
                self.metrics.incr(Counter::IntakeDropped);
                false
            }
        }
    }
}

/// Read-only view of monitor state for diagnostics
#[derive(Clone)]
pub struct MonitorInspector {
    histories: Histories,
    limiter: Arc<RateLimiter>,
}

impl MonitorInspector {
    /// Recent history of a channel, oldest first; empty if never seen
    #[must_use]
    pub fn history_snapshot(&self, channel_id: &str) -> Vec<ChatMessage> {
        self.histories
            .get(channel_id)
            .map(|history| history.snapshot())
            .unwrap_or_default()
    }

    /// Ids of channels with a history buffer
    #[must_use]
    pub fn tracked_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .histories
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        channels.sort();
        channels
    }

    #[must_use]
    pub fn limiter_status(&self) -> LimiterStatus {
        self.limiter.status()
    }
}

/// Pipeline state owned by the consumer task
struct Pipeline {
    config: Arc<ModerationConfig>,
    skip: SkipList,
    tools: Vec<&'static Tool>,
    histories: Histories,
    engine: DecisionEngine,
    dispatcher: ActionDispatcher,
    audit: Arc<dyn AuditStore>,
    metrics: Arc<dyn MetricsSink>,
}

/// The moderation pipeline and its intake queue
pub struct Monitor {
    pipeline: Pipeline,
    limiter: Arc<RateLimiter>,
    tx: Sender<ChatMessage>,
    rx: Receiver<ChatMessage>,
}

impl Monitor {
    pub fn new(config: ModerationConfig, parts: MonitorParts) -> Self {
        let config = Arc::new(config);
        let limiter = Arc::new(RateLimiter::new(config.rate_limits.actions_per_minute));
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        let skip = SkipList::new(
            config
                .skip_users
                .iter()
                .chain(config.owner_username.iter()),
        );
        let tools = allowed_tools(&config.allowed_tools, config.allow_elevated_tools);

        let dispatcher = ActionDispatcher::new(
            Arc::clone(&config),
            Arc::clone(&limiter),
            parts.enforcement,
            parts.identity,
            parts.chat,
        );

        Self {
            pipeline: Pipeline {
                skip,
                tools,
                histories: Arc::new(DashMap::new()),
                engine: DecisionEngine::new(parts.oracle),
                dispatcher,
                audit: parts.audit,
                metrics: parts.metrics,
                config,
            },
            limiter,
            tx,
            rx,
        }
    }

    /// A producer handle; the consumer stops once every handle is dropped
    #[must_use]
    pub fn intake(&self) -> IntakeSender {
        IntakeSender {
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.pipeline.metrics),
        }
    }

    #[must_use]
    pub fn inspector(&self) -> MonitorInspector {
        MonitorInspector {
            histories: Arc::clone(&self.pipeline.histories),
            limiter: Arc::clone(&self.limiter),
        }
    }

    /// Drain the intake queue until cancelled or every producer is gone
    ///
    /// Cancellation is only observed between messages, so an in-flight
    /// action always completes.
    pub async fn run(self, cancel: CancellationToken) {
        let Self {
            pipeline, tx, mut rx, ..
        } = self;
        drop(tx);
        info!(
            target: MONITOR_TARGET,
            dry_run = pipeline.config.dry_run,
            tools = pipeline.tools.len(),
            "Moderation monitor started"
        );

        loop {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(target: MONITOR_TARGET, "Moderation monitor cancelled");
                    break;
                }
                message = rx.recv() => message,
            };
            let Some(message) = message else {
                info!(target: MONITOR_TARGET, "Intake closed, moderation monitor stopping");
                break;
            };
            pipeline.process(message).await;
        }
    }

    /// Run one message through the whole pipeline
    pub async fn process_message(&self, message: ChatMessage) -> MessageOutcome {
        self.pipeline.process(message).await
    }
}

impl Pipeline {
    fn history_for(&self, channel_id: &str) -> Arc<HistoryBuffer> {
        if let Some(history) = self.histories.get(channel_id) {
            return history.value().clone();
        }
        self.histories
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(HistoryBuffer::new(self.config.history_size)))
            .value()
            .clone()
    }

    async fn process(&self, message: ChatMessage) -> MessageOutcome {
        if let Some(reason) = self.drop_reason(&message) {
            debug!(
                target: MONITOR_TARGET,
                event = "dropped",
                reason = %reason,
                author = %message.author,
                channel = %message.channel.name
            );
            return MessageOutcome::Dropped(reason);
        }

        let history = self.history_for(&message.channel.id);
        history.add(message.clone());

        if !needs_evaluation(&message.text) {
            self.metrics.incr(Counter::Filtered);
            debug!(target: MONITOR_TARGET, event = "filtered", message_id = %message.id);
            return MessageOutcome::FilteredOut;
        }

        let ctx = EvaluationContext {
            history: history.snapshot(),
            rules: self.config.channel_rules.clone(),
            sensitivity: self.config.sensitivity,
            message,
        };

        let mut decision = match self.engine.evaluate(&ctx, &self.tools).await {
            Ok(decision) => {
                self.metrics.incr(Counter::OracleSuccess);
                decision
            }
            Err(e) => {
                self.metrics.incr(Counter::OracleFailure);
                error!(
                    target: MONITOR_TARGET,
                    event = "evaluation_failed",
                    message_id = %ctx.message.id,
                    author = %ctx.message.author,
                    error = %e,
                    "Failed to evaluate message"
                );
                return MessageOutcome::EvaluationFailed;
            }
        };
        let message = ctx.message;

        if !decision.should_act {
            self.metrics.incr(Counter::NoAction);
            debug!(
                target: MONITOR_TARGET,
                event = "no_action",
                message_id = %message.id,
                reasoning = %decision.reasoning
            );
            self.write_audit(ModAction::record(&message, &decision, None))
                .await;
            return MessageOutcome::NoAction;
        }

        let result = match self.dispatcher.execute(&mut decision, &message).await {
            Ok(result) => result,
            Err(ModerationError::AdmissionDenied(reason)) => {
                self.metrics.incr(Counter::AdmissionDenied);
                warn!(
                    target: MONITOR_TARGET,
                    event = "admission_denied",
                    reason = %reason,
                    tool = %decision.tool_name(),
                    author = %message.author,
                    "Moderation action denied"
                );
                return MessageOutcome::Denied(reason);
            }
            Err(e) => ExecutionResult {
                success: false,
                error: Some(e.to_string()),
                ..ExecutionResult::default()
            },
        };

        let outcome = if result.dry_run {
            self.metrics.incr(Counter::DryRun);
            MessageOutcome::DryRun
        } else if result.success {
            self.metrics.incr(Counter::ActionSucceeded);
            MessageOutcome::Executed { success: true }
        } else {
            self.metrics.incr(Counter::ActionFailed);
            MessageOutcome::Executed { success: false }
        };

        info!(
            target: MONITOR_TARGET,
            event = "executed",
            tool = %decision.tool_name(),
            author = %message.author,
            target_user_id = decision.target_user_id.as_deref().unwrap_or(""),
            success = result.success,
            dry_run = result.dry_run,
            reasoning = %decision.reasoning,
            "Moderation action attempted"
        );
        self.write_audit(ModAction::record(&message, &decision, Some(&result)))
            .await;

        outcome
    }

    fn drop_reason(&self, message: &ChatMessage) -> Option<DropReason> {
        if !self.config.enabled {
            Some(DropReason::Disabled)
        } else if !self.config.is_channel_moderated(&message.channel) {
            Some(DropReason::UnmoderatedChannel)
        } else if self.skip.should_skip_user(&message.author) {
            Some(DropReason::SkippedUser)
        } else {
            None
        }
    }

    async fn write_audit(&self, action: ModAction) {
        let tool = action.tool_name.clone();
        match self.audit.append(action).await {
            Ok(id) => debug!(target: AUDIT_TARGET, id = %id, tool = %tool, "Audit record written"),
            Err(e) => {
                self.metrics.incr(Counter::AuditFailure);
                error!(target: AUDIT_TARGET, tool = %tool, error = %e, "Failed to write audit record");
            }
        }
    }
}
