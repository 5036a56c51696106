//! Configuration system for the Conduit session server.
//!
//! Provides TOML-based configuration with:
//! - Session caps, store capacities, snapshot file, demo data and logging
//! - Config file layering (XDG user config + project-local overrides)
//! - `CONDUIT_*` environment overrides on top of the file layers

pub mod discovery;
pub mod env;
pub mod error;
pub mod types;

pub use discovery::{ConfigSource, LoadedConfig, read_config_file, user_config_dir};
pub use error::{ConfigError, Result};
pub use types::*;
