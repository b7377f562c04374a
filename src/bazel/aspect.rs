//! Location of the IDE aspect and the flags that enable it.

use std::path::{Path, PathBuf};

/// Name under which the aspect workspace is mounted as an external repository.
pub const ASPECT_REPOSITORY: &str = "local_ide_aspect";

/// Label of the aspect inside its workspace, used when none is configured.
pub const DEFAULT_ASPECT_LABEL: &str = "//:e4b_aspect.bzl%e4b_aspect";

/// Where the IDE aspect lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectLocation {
    workspace_directory: PathBuf,
    label: String,
}

impl AspectLocation {
    /// Create a location from the aspect's workspace directory and its label
    /// within that workspace, e.g. `//:e4b_aspect.bzl%e4b_aspect`.
    #[must_use]
    pub fn new(workspace_directory: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            workspace_directory: workspace_directory.into(),
            label: label.into(),
        }
    }

    /// Directory holding the aspect workspace.
    #[must_use]
    pub fn workspace_directory(&self) -> &Path {
        &self.workspace_directory
    }

    /// Label of the aspect inside its workspace.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Flags passed to every `build` and `test` invocation.
    #[must_use]
    pub fn build_options(&self) -> Vec<String> {
        vec![
            "--watchfs".to_string(),
            format!(
                "--override_repository={ASPECT_REPOSITORY}={}",
                self.workspace_directory.display()
            ),
            format!("--aspects=@{ASPECT_REPOSITORY}{}", self.label),
        ]
    }

    /// Flags for an analysis build emitting the build metadata artifacts.
    #[must_use]
    pub fn aspect_options(&self) -> Vec<String> {
        let mut options = self.build_options();
        options.extend(
            [
                "-k",
                "--output_groups=ide-info-text,ide-resolve,-_,-defaults",
                "--experimental_show_artifacts",
            ]
            .map(String::from),
        );
        options
    }
}
