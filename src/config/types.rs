//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bazel::{AspectLocation, DEFAULT_ASPECT_LABEL};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Path to the Bazel binary.
    pub bazel_path: Option<PathBuf>,
    /// Where the IDE aspect lives.
    pub aspect: AspectConfig,
}

/// IDE aspect configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectConfig {
    /// Workspace directory holding the aspect. Defaults to
    /// `<data_dir>/bazel-driver/aspect`.
    pub workspace_directory: Option<PathBuf>,
    /// Label of the aspect inside its workspace.
    pub label: String,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            workspace_directory: None,
            label: DEFAULT_ASPECT_LABEL.to_string(),
        }
    }
}

impl AspectConfig {
    /// Resolve the configured aspect location.
    #[must_use]
    pub fn location(&self) -> AspectLocation {
        let directory = self
            .workspace_directory
            .clone()
            .or_else(default_aspect_directory)
            .unwrap_or_else(|| PathBuf::from("."));
        AspectLocation::new(directory, self.label.clone())
    }
}

fn default_aspect_directory() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("bazel-driver").join("aspect"))
}
