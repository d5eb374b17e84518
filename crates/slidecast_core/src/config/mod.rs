//! Configuration management for slidecast.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Environment variable overrides for paths and tools
//! - Validation on load with automatic defaults
//!
//! Settings are read once and handed to the orchestrator as an immutable
//! value; nothing in the engine reads configuration from global state.
//!
//! # Example
//!
//! ```no_run
//! use slidecast_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/slidecast.toml");
//! config.load_or_create().unwrap();
//! config.settings_mut().apply_env_overrides();
//!
//! println!("Slides: {}", config.settings().paths.image_dir);
//!
//! config.settings_mut().assembly.fade_duration_secs = 0.5;
//! config.update_section(ConfigSection::Assembly).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AssemblySettings, ConfigSection, EncodeSettings, LoggingSettings, PathSettings, Settings,
    ToolSettings, ENV_OVERRIDES,
};
