//! Engine parameters - how use cases talk to the session store.
//!
//! [`EngineConfig`] groups the static parameters for polling, write
//! conflicts, transport retries and retention. These are application-layer
//! concerns, not domain policy.

use dialogos_domain::GroupConfiguration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a mutation does when the stored record moved on since it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Reject the write with a concurrent-write conflict.
    #[default]
    CompareAndSwap,
    /// Overwrite the newer record, but log and record the conflict.
    LastWriterWins,
}

impl WritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritePolicy::CompareAndSwap => "compare_and_swap",
            WritePolicy::LastWriterWins => "last_writer_wins",
        }
    }
}

impl std::fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store interaction parameters.
///
/// | Field | Used by |
/// |-------|---------|
/// | `poll_interval` | [`WatchSessionUseCase`](crate::use_cases::watch_session::WatchSessionUseCase) |
/// | `write_policy`, `transport_retries`, `retry_base_delay` | every mutating use case |
/// | `retention` | [`PurgeSessionsUseCase`](crate::use_cases::purge_sessions::PurgeSessionsUseCase) |
/// | `default_groups` | group sessions created without an explicit configuration |
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Interval between background polls of a watched session.
    pub poll_interval: Duration,
    pub write_policy: WritePolicy,
    /// Extra attempts for a read that failed with a transport error.
    pub transport_retries: u32,
    /// First backoff delay; doubles on each further attempt.
    pub retry_base_delay: Duration,
    /// How long completed sessions are kept before a purge removes them.
    pub retention: Duration,
    pub default_groups: GroupConfiguration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            write_policy: WritePolicy::CompareAndSwap,
            transport_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            retention: Duration::from_secs(7 * 24 * 60 * 60),
            default_groups: GroupConfiguration::default(),
        }
    }
}

impl EngineConfig {
    // ==================== Builder Methods ====================

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_default_groups(mut self, groups: GroupConfiguration) -> Self {
        self.default_groups = groups;
        self
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry_base_delay.saturating_mul(factor)
    }

    /// Retention as a calendar duration for comparing record timestamps.
    pub fn retention_period(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogos_domain::GroupSize;

    #[test]
    fn test_default() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.write_policy, WritePolicy::CompareAndSwap);
        assert_eq!(config.transport_retries, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(100));
        assert_eq!(config.retention, Duration::from_secs(604_800));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_poll_interval(Duration::from_secs(1))
            .with_write_policy(WritePolicy::LastWriterWins)
            .with_transport_retries(0)
            .with_default_groups(GroupConfiguration::default().with_group_size(GroupSize::Three));

        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.write_policy, WritePolicy::LastWriterWins);
        assert_eq!(config.transport_retries, 0);
        assert_eq!(config.default_groups.group_size, GroupSize::Three);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = EngineConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_write_policy_serde() {
        let policy: WritePolicy = serde_json::from_str("\"last_writer_wins\"").unwrap();
        assert_eq!(policy, WritePolicy::LastWriterWins);
        assert_eq!(WritePolicy::CompareAndSwap.to_string(), "compare_and_swap");
    }

    #[test]
    fn test_retention_period() {
        let config = EngineConfig::default().with_retention(Duration::from_secs(3600));
        assert_eq!(config.retention_period(), chrono::Duration::hours(1));
    }
}
