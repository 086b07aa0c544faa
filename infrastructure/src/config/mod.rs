//! Configuration file loading for dialogos
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./dialogos.toml` or `./.dialogos.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/dialogos/config.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileEngineConfig, FileGroupsConfig, FileLoggingConfig,
};
pub use loader::ConfigLoader;
