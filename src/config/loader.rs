//! Locating and reading the driver configuration file.

use std::path::{Path, PathBuf};

use super::types::DriverConfig;

/// File name looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".bazel-driver.toml";

/// Reads [`DriverConfig`] from the first existing file among its candidates.
///
/// By default the candidates are [`LOCAL_CONFIG_FILE`] in the current
/// directory, then `bazel-driver/config.toml` under the user configuration
/// directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    candidates: Vec<PathBuf>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let user_file = dirs::config_dir().map(|dir| dir.join("bazel-driver").join("config.toml"));
        let candidates = std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE))
            .chain(user_file)
            .collect();
        Self { candidates }
    }

    /// Only consider `path`.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            candidates: vec![path],
        }
    }

    /// Candidate files, most specific first.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// The candidate that will be read, if any exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.candidates.iter().find(|p| p.is_file()).cloned()
    }

    /// Read the configuration. Defaults apply when no candidate exists.
    ///
    /// Relative paths in the file are taken relative to the file itself.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse` if the selected
    /// file cannot be read or decoded.
    pub fn load(&self) -> Result<DriverConfig, ConfigError> {
        let Some(path) = self.find_config_file() else {
            tracing::debug!(candidates = ?self.candidates, "No configuration file, using defaults");
            return Ok(DriverConfig::default());
        };
        tracing::debug!(path = %path.display(), "Reading configuration");

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: DriverConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        let base = path.parent().unwrap_or(Path::new("."));
        config.bazel_path = config.bazel_path.map(|p| relative_to(base, p));
        config.aspect.workspace_directory = config
            .aspect
            .workspace_directory
            .map(|p| relative_to(base, p));
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn relative_to(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Failure to load the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// The file the error is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}
