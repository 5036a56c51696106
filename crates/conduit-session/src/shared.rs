//! Lock-guarded container handle with startup/shutdown persistence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{error, info};

use crate::config::ContainerConfig;
use crate::container::SessionContainer;
use crate::error::Result;

/// Cloneable handle serializing all access to one [`SessionContainer`].
///
/// Hand a clone to every request worker. Each request should hold the lock
/// for the whole resolve-then-read/write sequence.
#[derive(Debug, Clone)]
pub struct SharedContainer {
    inner: Arc<Mutex<SessionContainer>>,
    data_file: Option<PathBuf>,
}

impl SharedContainer {
    /// Create a container. `data_file` enables snapshot persistence.
    pub fn new(config: ContainerConfig, data_file: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(SessionContainer::new(config)?)),
            data_file,
        })
    }

    /// The snapshot file, if persistence is enabled.
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    /// Lock the container.
    pub fn lock(&self) -> MutexGuard<'_, SessionContainer> {
        self.inner.lock()
    }

    /// Run `f` with the container locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionContainer) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Restore sessions from the data file. Returns how many were restored.
    ///
    /// Failures are logged and leave the container as it was.
    pub fn startup(&self) -> usize {
        let Some(path) = &self.data_file else {
            return 0;
        };
        match self.inner.lock().load_snapshot(path) {
            Ok(restored) => {
                info!(path = %path.display(), sessions = restored, "Session container started");
                restored
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to restore sessions");
                0
            }
        }
    }

    /// Save sessions to the data file. Returns how many were saved.
    ///
    /// Failures are logged; in-memory state is untouched either way.
    pub fn shutdown(&self) -> usize {
        let Some(path) = &self.data_file else {
            return 0;
        };
        match self.inner.lock().save_snapshot(path) {
            Ok(saved) => saved,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to save sessions");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_without_data_file() {
        let shared = SharedContainer::new(ContainerConfig::default(), None).unwrap();
        shared
            .with(|sessions| sessions.get_or_create_session(Some("a"), None, None))
            .unwrap();
        assert_eq!(shared.shutdown(), 0);
        assert_eq!(shared.startup(), 0);
        assert!(shared.data_file().is_none());
    }

    #[test]
    fn test_shutdown_then_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let first = SharedContainer::new(ContainerConfig::default(), Some(path.clone())).unwrap();
        first
            .lock()
            .get_or_create_session(Some("a"), None, None)
            .unwrap();
        assert_eq!(first.shutdown(), 1);
        // Saving leaves the live container intact.
        assert!(first.lock().contains("a"));

        let second = SharedContainer::new(ContainerConfig::default(), Some(path.clone())).unwrap();
        assert_eq!(second.startup(), 1);
        assert!(second.lock().contains("a"));
        assert!(!path.exists());
    }

    #[test]
    fn test_startup_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{ broken").unwrap();

        let shared = SharedContainer::new(ContainerConfig::default(), Some(path)).unwrap();
        assert_eq!(shared.startup(), 0);
        assert!(shared.lock().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let shared = SharedContainer::new(ContainerConfig::default(), None).unwrap();
        let clone = shared.clone();
        clone
            .with(|sessions| sessions.get_or_create_session(Some("a"), None, None))
            .unwrap();
        assert!(shared.lock().contains("a"));
    }
}
