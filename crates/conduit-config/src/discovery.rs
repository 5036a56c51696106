//! Locating and layering config files.
//!
//! Two file layers are read, lowest precedence first: `config.toml` in the
//! user config directory, then `conduit.toml` in the project directory.
//! `CONDUIT_*` variables are applied afterwards by the caller (see
//! [`crate::env`]).

use std::path::{Path, PathBuf};

use crate::{ConduitConfig, ConfigError, Result};

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "conduit.toml";

/// Config file name inside the user config directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Overrides the user config directory.
pub const CONFIG_DIR_ENV: &str = "CONDUIT_CONFIG_DIR";

/// One config file that was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Found, parsed and merged.
    pub loaded: bool,
}

/// Merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: ConduitConfig,
    /// Files checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Files that exist but were skipped because they failed to load.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Merge the user and project layers found from the current directory.
    pub fn discover() -> Self {
        Self::discover_in(Path::new("."), user_config_dir().as_deref())
    }

    /// Merge the layers under explicit directories.
    ///
    /// A broken file is skipped with a warning so one bad layer does not
    /// hide the others.
    pub fn discover_in(project_dir: &Path, user_dir: Option<&Path>) -> Self {
        let mut loaded = Self::default();
        if let Some(dir) = user_dir {
            loaded.layer(dir.join(USER_CONFIG_FILE));
        }
        loaded.layer(project_dir.join(PROJECT_CONFIG_FILE));
        loaded
    }

    /// Load exactly one file, skipping discovery. Any failure is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: read_config_file(path)?,
            sources: vec![ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }],
            warnings: Vec::new(),
        })
    }

    /// Paths of the files that contributed to `config`.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }

    fn layer(&mut self, path: PathBuf) {
        let loaded = path.is_file()
            && match read_config_file(&path) {
                Ok(layer) => {
                    self.config.merge(layer);
                    true
                }
                Err(e) => {
                    self.warnings.push(format!("skipped {}: {e}", path.display()));
                    false
                }
            };
        self.sources.push(ConfigSource { path, loaded });
    }
}

/// Read and parse one config file.
pub fn read_config_file(path: &Path) -> Result<ConduitConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    ConduitConfig::from_toml(&contents)
}

/// `$CONDUIT_CONFIG_DIR` when set, else `<platform config dir>/conduit`.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join("conduit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_nothing_found_yields_defaults() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let loaded = LoadedConfig::discover_in(project.path(), Some(user.path()));

        assert_eq!(loaded.config, ConduitConfig::new());
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.warnings.is_empty());
        assert_eq!(
            loaded.sources[0].path,
            user.path().join(USER_CONFIG_FILE)
        );
        assert_eq!(
            loaded.sources[1].path,
            project.path().join(PROJECT_CONFIG_FILE)
        );
    }

    #[test]
    fn test_project_sessions_replace_user_sessions() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(
            user.path().join(USER_CONFIG_FILE),
            "[sessions]\nmax_sessions = 100\nmax_sessions_per_address = 4\n\n[demo]\npopulate = true\n",
        )
        .unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[sessions]\nmax_sessions = 5\n",
        )
        .unwrap();

        let loaded = LoadedConfig::discover_in(project.path(), Some(user.path()));
        let sessions = loaded.config.sessions();

        assert_eq!(sessions.max_sessions, 5);
        // Sections merge whole, so the user's per-address cap is not kept.
        assert_eq!(sessions.max_sessions_per_address, 30);
        assert!(loaded.config.demo().populate);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_without_user_dir_only_project_is_checked() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[persistence]\ndata_file = \"sessions.json\"\n",
        )
        .unwrap();

        let loaded = LoadedConfig::discover_in(project.path(), None);

        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(
            loaded.config.persistence().data_file,
            Some(PathBuf::from("sessions.json"))
        );
    }

    #[test]
    fn test_broken_layer_is_skipped_with_warning() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(user.path().join(USER_CONFIG_FILE), "[sessions\nbroken").unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[store]\nmax_users = 3\n",
        )
        .unwrap();

        let loaded = LoadedConfig::discover_in(project.path(), Some(user.path()));

        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains(USER_CONFIG_FILE));
        assert_eq!(loaded.config.store().max_users, 3);
        let project_file = project.path().join(PROJECT_CONFIG_FILE);
        assert_eq!(loaded.loaded_from(), vec![project_file.as_path()]);
    }

    #[test]
    fn test_explicit_file_errors_instead_of_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");

        assert!(matches!(
            LoadedConfig::from_file(&path),
            Err(ConfigError::ReadFile { .. })
        ));

        fs::write(&path, "max_sessions = {{").unwrap();
        assert!(matches!(
            LoadedConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));

        fs::write(&path, "[store]\nmax_articles = 7\n").unwrap();
        let loaded = LoadedConfig::from_file(&path).unwrap();
        assert_eq!(loaded.config.store().max_articles, 7);
        assert_eq!(loaded.loaded_from(), vec![path.as_path()]);
    }
}
