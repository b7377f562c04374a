//! Shared plumbing for running the configured Bazel binary.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::command::{Command, CommandBuilder, CommandConsoleFactory};

use super::aspect::AspectLocation;
use super::error::{BazelError, BazelNotFoundError};

/// Which console a command writes its unselected output to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ConsoleType<'a> {
    /// Discard unselected output.
    NoConsole,
    /// The console for commands not tied to a workspace.
    System,
    /// The console of one workspace.
    Workspace(&'a Path),
}

impl ConsoleType<'_> {
    fn name(self) -> Option<String> {
        match self {
            Self::NoConsole => None,
            Self::System => Some("Bazel [system]".to_string()),
            Self::Workspace(root) => Some(format!("Bazel [{}]", root.display())),
        }
    }
}

/// State shared by the facade and every workspace session: the binary path,
/// the console factory and the fixed flag sets.
pub(crate) struct BazelRunner {
    bazel: RwLock<Option<PathBuf>>,
    console_factory: Option<Arc<dyn CommandConsoleFactory>>,
    build_options: Vec<String>,
    aspect_options: Vec<String>,
}

impl BazelRunner {
    pub(crate) fn new(
        aspect: &AspectLocation,
        console_factory: Option<Arc<dyn CommandConsoleFactory>>,
    ) -> Self {
        Self {
            bazel: RwLock::new(None),
            console_factory,
            build_options: aspect.build_options(),
            aspect_options: aspect.aspect_options(),
        }
    }

    pub(crate) fn set_bazel_path(&self, path: PathBuf) {
        *self.bazel.write().unwrap_or_else(PoisonError::into_inner) = Some(path);
    }

    pub(crate) fn configured_path(&self) -> Option<PathBuf> {
        self.bazel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The configured binary, checked for existence at call time.
    pub(crate) fn bazel_path(&self) -> Result<PathBuf, BazelNotFoundError> {
        let path = self.configured_path().ok_or(BazelNotFoundError::NotSet)?;
        if is_executable(&path) {
            Ok(path)
        } else {
            Err(BazelNotFoundError::NotExecutable)
        }
    }

    pub(crate) fn build_options(&self) -> &[String] {
        &self.build_options
    }

    pub(crate) fn aspect_options(&self) -> &[String] {
        &self.aspect_options
    }

    fn builder(
        &self,
        console: ConsoleType<'_>,
        directory: &Path,
    ) -> Result<CommandBuilder, BazelError> {
        let bazel = self.bazel_path()?;
        let mut builder = Command::builder()
            .directory(directory)
            .arg(bazel.to_string_lossy())
            .console_name(console.name());
        if let Some(factory) = &self.console_factory {
            builder = builder.console_factory(factory.clone());
        }
        Ok(builder)
    }

    /// Run Bazel and return the standard output lines picked by `selector`.
    /// A non-zero exit yields no lines.
    pub(crate) async fn output_lines<F>(
        &self,
        console: ConsoleType<'_>,
        directory: &Path,
        args: &[String],
        selector: F,
    ) -> Result<Vec<String>, BazelError>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let mut command = self
            .builder(console, directory)?
            .args(args.iter().cloned())
            .stdout_selector(selector)
            .build()?;
        if command.run().await? == 0 {
            Ok(command.selected_output_lines().to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    /// Run Bazel and return the standard error lines picked by `selector`.
    /// A non-zero exit yields no lines.
    pub(crate) async fn error_lines<F>(
        &self,
        console: ConsoleType<'_>,
        directory: &Path,
        args: &[String],
        selector: F,
    ) -> Result<Vec<String>, BazelError>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let mut command = self
            .builder(console, directory)?
            .args(args.iter().cloned())
            .stderr_selector(selector)
            .build()?;
        if command.run().await? == 0 {
            Ok(command.selected_error_lines().to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    /// Run Bazel with all output going to the console; return the exit code.
    pub(crate) async fn run(
        &self,
        console: ConsoleType<'_>,
        directory: &Path,
        args: &[String],
    ) -> Result<i32, BazelError> {
        let mut command = self
            .builder(console, directory)?
            .args(args.iter().cloned())
            .build()?;
        Ok(command.run().await?)
    }
}

/// Keep every line.
pub(crate) fn all_lines(line: &str) -> Option<String> {
    Some(line.to_string())
}

pub(crate) fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        metadata.is_file()
    }
}
