//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

use dialogos_application::{EngineConfig, WritePolicy};
use dialogos_domain::{GroupConfiguration, GroupRotation, GroupSize, ObserverStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("engine.poll_interval_secs cannot be 0")]
    ZeroPollInterval,

    #[error("engine.retention_days cannot be 0")]
    ZeroRetention,

    #[error("groups.max_groups must be at least 1")]
    ZeroMaxGroups,
}

/// Raw engine configuration from TOML (`[engine]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub poll_interval_secs: u64,
    pub write_policy: WritePolicy,
    pub transport_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retention_days: u32,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            write_policy: WritePolicy::default(),
            transport_retries: 3,
            retry_base_delay_ms: 100,
            retention_days: 7,
        }
    }
}

/// Raw default group configuration from TOML (`[groups]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGroupsConfig {
    /// `3`, `4` or `"mixed"`
    pub group_size: GroupSize,
    pub auto_assign_roles: bool,
    pub group_rotation: GroupRotation,
    pub observer_strategy: ObserverStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_groups: Option<u32>,
}

impl Default for FileGroupsConfig {
    fn default() -> Self {
        let defaults = GroupConfiguration::default();
        Self {
            group_size: defaults.group_size,
            auto_assign_roles: defaults.auto_assign_roles,
            group_rotation: defaults.group_rotation,
            observer_strategy: defaults.observer_strategy,
            max_groups: defaults.max_groups,
        }
    }
}

impl FileGroupsConfig {
    pub fn to_group_configuration(&self) -> GroupConfiguration {
        GroupConfiguration {
            group_size: self.group_size,
            auto_assign_roles: self.auto_assign_roles,
            group_rotation: self.group_rotation,
            observer_strategy: self.observer_strategy,
            max_groups: self.max_groups,
        }
    }
}

/// Raw logging configuration from TOML (`[logging]`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL session event log; disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub engine: FileEngineConfig,
    pub groups: FileGroupsConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.engine.poll_interval_secs == 0 {
            return Err(ConfigValidationError::ZeroPollInterval);
        }
        if self.engine.retention_days == 0 {
            return Err(ConfigValidationError::ZeroRetention);
        }
        if self.groups.max_groups == Some(0) {
            return Err(ConfigValidationError::ZeroMaxGroups);
        }
        Ok(())
    }

    /// Build the application's engine parameters.
    pub fn to_engine_config(&self) -> EngineConfig {
        let engine = &self.engine;
        EngineConfig::default()
            .with_poll_interval(Duration::from_secs(engine.poll_interval_secs))
            .with_write_policy(engine.write_policy)
            .with_transport_retries(engine.transport_retries)
            .with_retry_base_delay(Duration::from_millis(engine.retry_base_delay_ms))
            .with_retention(Duration::from_secs(u64::from(engine.retention_days) * 24 * 60 * 60))
            .with_default_groups(self.groups.to_group_configuration())
    }
}
