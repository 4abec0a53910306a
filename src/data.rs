use std::{ops::Deref, sync::Arc};

use crate::config::BotConfig;
use crate::moderation::{MonitorInspector, MonitorStats};
use chrono::{DateTime, Utc};

/// Shared state handed to poise commands
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    #[must_use]
    pub fn new(config: BotConfig, inspector: MonitorInspector, stats: Arc<MonitorStats>) -> Self {
        Self(Arc::new(DataInner {
            config: Arc::new(config),
            inspector,
            stats,
            started_at: Utc::now(),
        }))
    }
}

pub struct DataInner {
    // Configuration the monitor was started with
    pub config: Arc<BotConfig>,
    // Read-only view of the monitor's history and admission budget
    pub inspector: MonitorInspector,
    // Counters the monitor reports into
    pub stats: Arc<MonitorStats>,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModerationConfig;
    use crate::moderation::{
        MemoryAuditStore, Monitor, MonitorParts, MockChatTransport, MockEnforcement,
        MockIdentityResolver, StaticOracle,
    };

    fn inspector(stats: Arc<MonitorStats>) -> MonitorInspector {
        Monitor::new(
            ModerationConfig::default(),
            MonitorParts {
                oracle: Arc::new(StaticOracle),
                enforcement: Arc::new(MockEnforcement::new()),
                identity: Arc::new(MockIdentityResolver::new()),
                chat: Arc::new(MockChatTransport::new()),
                audit: Arc::new(MemoryAuditStore::new()),
                metrics: stats,
            },
        )
        .inspector()
    }

    #[test]
    fn test_data_new() {
        let stats = Arc::new(MonitorStats::new());
        let data = Data::new(BotConfig::default(), inspector(stats.clone()), stats);
        assert!(data.config.moderation.enabled);
        assert!(data.inspector.tracked_channels().is_empty());
        assert_eq!(data.stats.snapshot().oracle_success, 0);
    }

    #[test]
    fn test_data_debug_impl() {
        let stats = Arc::new(MonitorStats::new());
        let data = Data::new(BotConfig::default(), inspector(stats.clone()), stats);
        let debug_output = format!("{data:?}");
        assert!(debug_output.contains("Data"));
        assert!(debug_output.contains("config"));
        assert!(debug_output.contains("stats"));
    }
}
