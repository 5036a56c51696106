//! CLI command handlers.

use std::path::Path;

use anyhow::{Context as _, Result};
use conduit_config::{ConduitConfig, LoadedConfig};
use conduit_session::ContainerConfig;
use conduit_store::StoreLimits;

pub mod config;
pub mod inspect;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Effective configuration and where it came from.
    pub loaded: LoadedConfig,
}

/// Load the explicit config file or discover the layered one, then apply
/// `CONDUIT_*` overrides and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let mut loaded = match explicit {
        Some(path) => LoadedConfig::from_file(path)?,
        None => LoadedConfig::discover(),
    };
    loaded
        .config
        .apply_env_overrides()
        .context("invalid CONDUIT_* environment override")?;
    loaded.config.validate()?;
    Ok(loaded)
}

/// Container settings for `config`.
pub fn container_config(config: &ConduitConfig) -> ContainerConfig {
    let sessions = config.sessions();
    let store = config.store();
    let demo = config.demo();
    ContainerConfig::new()
        .with_max_sessions(sessions.max_sessions)
        .with_max_sessions_per_address(sessions.max_sessions_per_address)
        .with_isolation(!sessions.disable_isolation)
        .with_store_limits(
            StoreLimits::new()
                .with_max_id_len(store.max_id_len)
                .with_max_users(store.max_users)
                .with_max_articles(store.max_articles)
                .with_max_comments(store.max_comments)
                .with_max_follows(store.max_follows)
                .with_max_favorites(store.max_favorites),
        )
        .with_demo_data(demo.populate)
        .with_demo_image(demo.default_image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_config_mapping() {
        let config = ConduitConfig::from_toml(
            r#"
[sessions]
max_sessions = 7
max_sessions_per_address = 2
disable_isolation = true

[store]
max_comments = 3

[demo]
populate = true
"#,
        )
        .unwrap();

        let container = container_config(&config);
        assert_eq!(container.max_sessions, 7);
        assert_eq!(container.max_sessions_per_address, 2);
        assert!(container.disable_isolation);
        assert_eq!(container.store_limits.max_comments, 3);
        assert_eq!(container.store_limits.max_users, 60);
        assert!(container.populate_demo_data);
        assert!(container.validate().is_ok());
    }

    #[test]
    fn test_default_mapping_matches_container_defaults() {
        assert_eq!(
            container_config(&ConduitConfig::new()),
            ContainerConfig::default()
        );
    }
}
