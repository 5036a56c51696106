//! Configuration for the session container.

use conduit_store::StoreLimits;
use conduit_store::demo::DEFAULT_DEMO_IMAGE;

use crate::error::{Error, Result};

/// Default maximum number of live sessions before the oldest is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 3000;

/// Default maximum number of sessions attributed to one client address.
pub const DEFAULT_MAX_SESSIONS_PER_ADDRESS: usize = 30;

/// Configuration for [`SessionContainer`](crate::SessionContainer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Global session cap; also bounds the token binding table.
    pub max_sessions: usize,

    /// Per-address session cap. Must be at least 1.
    pub max_sessions_per_address: usize,

    /// Serve every caller from one shared dataset. No eviction or quotas.
    pub disable_isolation: bool,

    /// Capacities of each session's bounded stores.
    pub store_limits: StoreLimits,

    /// Seed new session data with the demo dataset.
    pub populate_demo_data: bool,

    /// Avatar used for demo users.
    pub demo_image: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_sessions_per_address: DEFAULT_MAX_SESSIONS_PER_ADDRESS,
            disable_isolation: false,
            store_limits: StoreLimits::default(),
            populate_demo_data: false,
            demo_image: DEFAULT_DEMO_IMAGE.to_string(),
        }
    }
}

impl ContainerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global session cap.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the per-address session cap.
    pub fn with_max_sessions_per_address(mut self, max: usize) -> Self {
        self.max_sessions_per_address = max;
        self
    }

    /// Enable or disable per-session isolation.
    pub fn with_isolation(mut self, enabled: bool) -> Self {
        self.disable_isolation = !enabled;
        self
    }

    /// Set the per-session store capacities.
    pub fn with_store_limits(mut self, limits: StoreLimits) -> Self {
        self.store_limits = limits;
        self
    }

    /// Enable or disable demo data for new sessions.
    pub fn with_demo_data(mut self, enabled: bool) -> Self {
        self.populate_demo_data = enabled;
        self
    }

    /// Set the avatar used for demo users.
    pub fn with_demo_image(mut self, image: impl Into<String>) -> Self {
        self.demo_image = image.into();
        self
    }

    /// Reject limits the container cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_sessions < 1 {
            return Err(Error::InvalidConfig(
                "max_sessions must be at least 1".to_string(),
            ));
        }
        if self.max_sessions_per_address < 1 {
            return Err(Error::InvalidConfig(format!(
                "max_sessions_per_address is set to {}, you need at least one",
                self.max_sessions_per_address
            )));
        }
        Ok(())
    }
}
