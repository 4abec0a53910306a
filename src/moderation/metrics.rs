//! Monitor counters

use derive_more::Display;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Events counted by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Counter {
    #[display("oracle_success")]
    OracleSuccess,
    #[display("oracle_failure")]
    OracleFailure,
    #[display("no_action")]
    NoAction,
    #[display("action_succeeded")]
    ActionSucceeded,
    #[display("action_failed")]
    ActionFailed,
    #[display("dry_run")]
    DryRun,
    #[display("admission_denied")]
    AdmissionDenied,
    #[display("audit_failure")]
    AuditFailure,
    #[display("intake_dropped")]
    IntakeDropped,
    #[display("filtered")]
    Filtered,
}

/// Where the monitor reports its counters
pub trait MetricsSink: Send + Sync {
    fn incr(&self, counter: Counter);
}

/// Default sink: process-local atomic counters
#[derive(Debug, Default)]
pub struct MonitorStats {
    oracle_success: AtomicU64,
    oracle_failure: AtomicU64,
    no_action: AtomicU64,
    action_succeeded: AtomicU64,
    action_failed: AtomicU64,
    dry_run: AtomicU64,
    admission_denied: AtomicU64,
    audit_failure: AtomicU64,
    intake_dropped: AtomicU64,
    filtered: AtomicU64,
}

/// Plain copy of the counters at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub oracle_success: u64,
    pub oracle_failure: u64,
    pub no_action: u64,
    pub action_succeeded: u64,
    pub action_failed: u64,
    pub dry_run: u64,
    pub admission_denied: u64,
    pub audit_failure: u64,
    pub intake_dropped: u64,
    pub filtered: u64,
}

impl MonitorStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::OracleSuccess => &self.oracle_success,
            Counter::OracleFailure => &self.oracle_failure,
            Counter::NoAction => &self.no_action,
            Counter::ActionSucceeded => &self.action_succeeded,
            Counter::ActionFailed => &self.action_failed,
            Counter::DryRun => &self.dry_run,
            Counter::AdmissionDenied => &self.admission_denied,
            Counter::AuditFailure => &self.audit_failure,
            Counter::IntakeDropped => &self.intake_dropped,
            Counter::Filtered => &self.filtered,
        }
    }

    #[must_use]
    pub fn get(&self, counter: Counter) -> u64 {
        self.slot(counter).load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            oracle_success: self.get(Counter::OracleSuccess),
            oracle_failure: self.get(Counter::OracleFailure),
            no_action: self.get(Counter::NoAction),
            action_succeeded: self.get(Counter::ActionSucceeded),
            action_failed: self.get(Counter::ActionFailed),
            dry_run: self.get(Counter::DryRun),
            admission_denied: self.get(Counter::AdmissionDenied),
            audit_failure: self.get(Counter::AuditFailure),
            intake_dropped: self.get(Counter::IntakeDropped),
            filtered: self.get(Counter::Filtered),
        }
    }
}

impl MetricsSink for MonitorStats {
    fn incr(&self, counter: Counter) {
        self.slot(counter).fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let stats = MonitorStats::new();
        stats.incr(Counter::OracleSuccess);
        stats.incr(Counter::OracleSuccess);
        stats.incr(Counter::AdmissionDenied);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.oracle_success, 2);
        assert_eq!(snapshot.admission_denied, 1);
        assert_eq!(snapshot.oracle_failure, 0);
        assert_eq!(stats.get(Counter::IntakeDropped), 0);
        assert_eq!(Counter::DryRun.to_string(), "dry_run");
    }
}
