//! `CONDUIT_*` environment variable overrides.
//!
//! Applied after file discovery, so the environment wins over every file
//! layer. Each variable overrides one field of one section.

use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::types::ConduitConfig;

pub const ENV_MAX_SESSIONS: &str = "CONDUIT_MAX_SESSIONS";
pub const ENV_MAX_SESSIONS_PER_ADDRESS: &str = "CONDUIT_MAX_SESSIONS_PER_ADDRESS";
pub const ENV_DISABLE_ISOLATION: &str = "CONDUIT_DISABLE_ISOLATION";
pub const ENV_MAX_ID_LEN: &str = "CONDUIT_MAX_ID_LEN";
pub const ENV_MAX_USERS: &str = "CONDUIT_MAX_USERS";
pub const ENV_MAX_ARTICLES: &str = "CONDUIT_MAX_ARTICLES";
pub const ENV_MAX_COMMENTS: &str = "CONDUIT_MAX_COMMENTS";
pub const ENV_MAX_FOLLOWS: &str = "CONDUIT_MAX_FOLLOWS";
pub const ENV_MAX_FAVORITES: &str = "CONDUIT_MAX_FAVORITES";
pub const ENV_DATA_FILE: &str = "CONDUIT_DATA_FILE";
pub const ENV_POPULATE_DEMO_DATA: &str = "CONDUIT_POPULATE_DEMO_DATA";
pub const ENV_DEMO_DEFAULT_IMAGE: &str = "CONDUIT_DEMO_DEFAULT_IMAGE";
pub const ENV_LOG_LEVEL: &str = "CONDUIT_LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "CONDUIT_LOG_FILE";

impl ConduitConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Empty values are ignored. Only the sections touched by a variable
    /// are materialized.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_MAX_SESSIONS) {
            self.sessions.get_or_insert_with(Default::default).max_sessions =
                parse_usize(ENV_MAX_SESSIONS, &value)?;
        }
        if let Some(value) = get(ENV_MAX_SESSIONS_PER_ADDRESS) {
            self.sessions
                .get_or_insert_with(Default::default)
                .max_sessions_per_address = parse_usize(ENV_MAX_SESSIONS_PER_ADDRESS, &value)?;
        }
        if let Some(value) = get(ENV_DISABLE_ISOLATION) {
            self.sessions
                .get_or_insert_with(Default::default)
                .disable_isolation = parse_bool(ENV_DISABLE_ISOLATION, &value)?;
        }

        let store_fields = [
            ENV_MAX_ID_LEN,
            ENV_MAX_USERS,
            ENV_MAX_ARTICLES,
            ENV_MAX_COMMENTS,
            ENV_MAX_FOLLOWS,
            ENV_MAX_FAVORITES,
        ];
        for key in store_fields {
            let Some(value) = get(key) else {
                continue;
            };
            let parsed = parse_usize(key, &value)?;
            let store = self.store.get_or_insert_with(Default::default);
            match key {
                ENV_MAX_ID_LEN => store.max_id_len = parsed,
                ENV_MAX_USERS => store.max_users = parsed,
                ENV_MAX_ARTICLES => store.max_articles = parsed,
                ENV_MAX_COMMENTS => store.max_comments = parsed,
                ENV_MAX_FOLLOWS => store.max_follows = parsed,
                _ => store.max_favorites = parsed,
            }
        }

        if let Some(value) = get(ENV_DATA_FILE) {
            self.persistence
                .get_or_insert_with(Default::default)
                .data_file = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_POPULATE_DEMO_DATA) {
            self.demo.get_or_insert_with(Default::default).populate =
                parse_bool(ENV_POPULATE_DEMO_DATA, &value)?;
        }
        if let Some(value) = get(ENV_DEMO_DEFAULT_IMAGE) {
            self.demo.get_or_insert_with(Default::default).default_image = value;
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            self.logging.get_or_insert_with(Default::default).level = value;
        }
        if let Some(value) = get(ENV_LOG_FILE) {
            self.logging.get_or_insert_with(Default::default).file = Some(PathBuf::from(value));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a non-negative integer",
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}
