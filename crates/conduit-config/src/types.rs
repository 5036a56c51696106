//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [sessions]      # global and per-address session caps, isolation
//! [store]         # per-session store capacities
//! [persistence]   # snapshot file
//! [demo]          # demo data for new sessions
//! [logging]       # log level and optional JSON log file
//! ```

use std::path::PathBuf;

use conduit_session::{DEFAULT_MAX_SESSIONS, DEFAULT_MAX_SESSIONS_PER_ADDRESS};
use conduit_store::demo::DEFAULT_DEMO_IMAGE;
use conduit_store::{
    DEFAULT_MAX_ARTICLES, DEFAULT_MAX_COMMENTS, DEFAULT_MAX_FAVORITES, DEFAULT_MAX_FOLLOWS,
    DEFAULT_MAX_ID_LEN, DEFAULT_MAX_USERS,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. Use the section accessors to read
/// effective values with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitConfig {
    /// Session container limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionsConfig>,

    /// Per-session store capacities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Snapshot persistence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceConfig>,

    /// Demo data seeding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo: Option<DemoConfig>,

    /// Logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl ConduitConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: ConduitConfig) {
        if other.sessions.is_some() {
            self.sessions = other.sessions;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.persistence.is_some() {
            self.persistence = other.persistence;
        }
        if other.demo.is_some() {
            self.demo = other.demo;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// A copy with every section present, for display.
    pub fn resolved(&self) -> Self {
        Self {
            sessions: Some(self.sessions()),
            store: Some(self.store()),
            persistence: Some(self.persistence()),
            demo: Some(self.demo()),
            logging: Some(self.logging()),
        }
    }

    /// Effective `[sessions]` section.
    pub fn sessions(&self) -> SessionsConfig {
        self.sessions.clone().unwrap_or_default()
    }

    /// Effective `[store]` section.
    pub fn store(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    /// Effective `[persistence]` section.
    pub fn persistence(&self) -> PersistenceConfig {
        self.persistence.clone().unwrap_or_default()
    }

    /// Effective `[demo]` section.
    pub fn demo(&self) -> DemoConfig {
        self.demo.clone().unwrap_or_default()
    }

    /// Effective `[logging]` section.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check that every limit is usable.
    ///
    /// Relation capacities may be zero (the store then ignores writes);
    /// everything else must be at least 1.
    pub fn validate(&self) -> Result<()> {
        let sessions = self.sessions();
        let store = self.store();
        let positive = [
            ("sessions.max_sessions", sessions.max_sessions),
            (
                "sessions.max_sessions_per_address",
                sessions.max_sessions_per_address,
            ),
            ("store.max_id_len", store.max_id_len),
            ("store.max_users", store.max_users),
            ("store.max_articles", store.max_articles),
            ("store.max_comments", store.max_comments),
        ];
        for (key, value) in positive {
            if value < 1 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("is set to {value}, must be at least 1"),
                });
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Session container configuration.
///
/// ```toml
/// [sessions]
/// max_sessions = 3000
/// max_sessions_per_address = 30
/// disable_isolation = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Live sessions kept before the least recently used is evicted.
    pub max_sessions: usize,
    /// Live sessions one client address may own.
    pub max_sessions_per_address: usize,
    /// Serve every client from one shared dataset.
    pub disable_isolation: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_sessions_per_address: DEFAULT_MAX_SESSIONS_PER_ADDRESS,
            disable_isolation: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Capacities of each session's stores.
///
/// ```toml
/// [store]
/// max_id_len = 64
/// max_users = 60
/// max_articles = 20
/// max_comments = 20
/// max_follows = 100
/// max_favorites = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_id_len: usize,
    pub max_users: usize,
    pub max_articles: usize,
    pub max_comments: usize,
    pub max_follows: usize,
    pub max_favorites: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_id_len: DEFAULT_MAX_ID_LEN,
            max_users: DEFAULT_MAX_USERS,
            max_articles: DEFAULT_MAX_ARTICLES,
            max_comments: DEFAULT_MAX_COMMENTS,
            max_follows: DEFAULT_MAX_FOLLOWS,
            max_favorites: DEFAULT_MAX_FAVORITES,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot persistence. Disabled unless `data_file` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Snapshot written on shutdown and consumed on startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo
// ─────────────────────────────────────────────────────────────────────────────

/// Demo data seeded into every new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub populate: bool,
    /// Avatar for demo users.
    pub default_image: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            populate: false,
            default_image: DEFAULT_DEMO_IMAGE.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
///
/// ```toml
/// [logging]
/// level = "info"
/// file = "/var/log/conduit/conduit.log"   # optional, rotated daily
/// json = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Log file; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Write the log file as JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = ConduitConfig::new();
        assert!(config.sessions.is_none());
        assert_eq!(config.sessions().max_sessions, 3000);
        assert_eq!(config.sessions().max_sessions_per_address, 30);
        assert_eq!(config.store().max_users, 60);
        assert_eq!(config.store().max_id_len, 64);
        assert!(config.persistence().data_file.is_none());
        assert!(!config.demo().populate);
        assert_eq!(config.logging().level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = r#"
[sessions]
max_sessions = 50

[store]
max_comments = 5

[persistence]
data_file = "/tmp/sessions.json"
"#;
        let config = ConduitConfig::from_toml(toml).unwrap();
        let sessions = config.sessions();
        assert_eq!(sessions.max_sessions, 50);
        assert_eq!(sessions.max_sessions_per_address, 30);
        assert_eq!(config.store().max_comments, 5);
        assert_eq!(config.store().max_articles, 20);
        assert_eq!(
            config.persistence().data_file,
            Some(PathBuf::from("/tmp/sessions.json"))
        );
        assert!(config.demo.is_none());
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = ConduitConfig::from_toml(
            r#"
[sessions]
max_sessions = 10

[demo]
populate = true
"#,
        )
        .unwrap();
        let overlay = ConduitConfig::from_toml(
            r#"
[sessions]
max_sessions_per_address = 2
"#,
        )
        .unwrap();
        base.merge(overlay);

        // Sections merge whole, not field by field.
        assert_eq!(base.sessions().max_sessions, 3000);
        assert_eq!(base.sessions().max_sessions_per_address, 2);
        assert!(base.demo().populate);
    }

    #[test]
    fn test_resolved_round_trip() {
        let config = ConduitConfig::new().resolved();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[sessions]"));
        assert!(toml.contains("max_sessions = 3000"));
        assert!(!toml.contains("data_file"));

        let parsed = ConduitConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_zero_per_address() {
        let config = ConduitConfig::from_toml(
            r#"
[sessions]
max_sessions_per_address = 0
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "sessions.max_sessions_per_address",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_allows_zero_link_capacity() {
        let config = ConduitConfig::from_toml(
            r#"
[store]
max_follows = 0
max_favorites = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }
}
