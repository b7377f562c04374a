//! Entry point for calling Bazel on behalf of an IDE.
//!
//! A [`BazelCommand`] holds the path to the Bazel binary and hands out one
//! [`BazelInstance`] per workspace. It is meant to be created once by the
//! embedding application and shared, e.g. behind an [`Arc`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::SystemTime;

use tokio::sync::Mutex;

use crate::command::{Command, CommandConsoleFactory};

use super::aspect::AspectLocation;
use super::error::{BazelError, BazelNotFoundError};
use super::instance::BazelInstance;
use super::runner::{all_lines, is_executable, BazelRunner, ConsoleType};
use super::version::{BazelVersion, VERSION_PREFIX};

/// A binary that passed the version check, as it was on disk at the time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VerifiedBinary {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl VerifiedBinary {
    fn stat(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Bazel entry point: binary configuration and per-workspace sessions.
pub struct BazelCommand {
    runner: Arc<BazelRunner>,
    aspect: AspectLocation,
    verified: StdMutex<Option<VerifiedBinary>>,
    instances: Mutex<HashMap<PathBuf, Arc<BazelInstance>>>,
}

impl BazelCommand {
    /// Create a command using the aspect at `aspect`. Unselected output of
    /// Bazel goes to consoles from `console_factory`, or nowhere if `None`.
    #[must_use]
    pub fn new(
        aspect: AspectLocation,
        console_factory: Option<Arc<dyn CommandConsoleFactory>>,
    ) -> Self {
        Self {
            runner: Arc::new(BazelRunner::new(&aspect, console_factory)),
            aspect,
            verified: StdMutex::new(None),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Set the path to the Bazel binary.
    ///
    /// Applies at once to every session, existing or future. The binary is
    /// only checked when it is next needed.
    pub fn set_bazel_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!(path = %path.display(), "Setting Bazel path");
        self.runner.set_bazel_path(path);
    }

    /// The configured Bazel binary, if any.
    #[must_use]
    pub fn bazel_path(&self) -> Option<PathBuf> {
        self.runner.configured_path()
    }

    /// The aspect location this command was created with.
    #[must_use]
    pub fn aspect_location(&self) -> &AspectLocation {
        &self.aspect
    }

    /// Check that `path` is a Bazel binary recent enough to be used.
    ///
    /// # Errors
    ///
    /// Returns `BazelNotFoundError::NotExecutable` if `path` cannot be run or
    /// `bazel version` fails, and `BazelNotFoundError::TooOld` if the version
    /// cannot be read (reported as `unknown`) or is below the minimum.
    pub async fn check_version(&self, path: &Path) -> Result<BazelVersion, BazelNotFoundError> {
        if !is_executable(path) {
            return Err(BazelNotFoundError::NotExecutable);
        }

        let directory = if self.aspect.workspace_directory().is_dir() {
            self.aspect.workspace_directory().to_path_buf()
        } else {
            std::env::temp_dir()
        };
        let mut command = Command::builder()
            .directory(directory)
            .arg(path.to_string_lossy())
            .arg("version")
            .stdout_selector(|line| line.strip_prefix(VERSION_PREFIX).map(str::to_string))
            .build()
            .map_err(|_| BazelNotFoundError::NotExecutable)?;

        match command.run().await {
            Ok(0) => {}
            Ok(code) => {
                tracing::debug!(path = %path.display(), code, "bazel version failed");
                return Err(BazelNotFoundError::NotExecutable);
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot run bazel version");
                return Err(BazelNotFoundError::NotExecutable);
            }
        }

        let [label] = command.selected_output_lines() else {
            return Err(BazelNotFoundError::TooOld("unknown".to_string()));
        };
        let version = BazelVersion::parse(label)
            .ok_or_else(|| BazelNotFoundError::TooOld(label.clone()))?;
        if !version.is_supported() {
            return Err(BazelNotFoundError::TooOld(label.clone()));
        }

        tracing::debug!(path = %path.display(), version = %label, "Bazel version accepted");
        Ok(version)
    }

    /// Return the session of the workspace enclosing `directory`, or `None`
    /// if `directory` is not inside a workspace.
    ///
    /// Directories of the same workspace share one session.
    ///
    /// # Errors
    ///
    /// Returns `BazelError::NotFound` if the configured binary is unset,
    /// missing or too old, or another error if Bazel cannot be run.
    pub async fn get_instance(
        &self,
        directory: &Path,
    ) -> Result<Option<Arc<BazelInstance>>, BazelError> {
        let bazel = self.runner.bazel_path()?;
        self.ensure_verified(&bazel).await?;

        let Some(workspace_root) = self.workspace_root(directory).await? else {
            tracing::debug!(dir = %directory.display(), "Not inside a Bazel workspace");
            return Ok(None);
        };

        let mut instances = self.instances.lock().await;
        if let Some(instance) = instances.get(&workspace_root) {
            return Ok(Some(Arc::clone(instance)));
        }

        let instance = Arc::new(
            BazelInstance::new(Arc::clone(&self.runner), workspace_root.clone()).await?,
        );
        instances.insert(workspace_root, Arc::clone(&instance));
        Ok(Some(instance))
    }

    /// Drop every session. The next `get_instance` call starts afresh.
    pub async fn clear_instances(&self) {
        self.instances.lock().await.clear();
    }

    // A passed check is reused while the file at `bazel` keeps its size and
    // modification time; replacing the binary triggers a new check.
    async fn ensure_verified(&self, bazel: &Path) -> Result<(), BazelNotFoundError> {
        let current = VerifiedBinary::stat(bazel);
        if current.is_some() && self.verified_binary() == current {
            return Ok(());
        }
        self.check_version(bazel).await?;
        *self.verified.lock().unwrap_or_else(PoisonError::into_inner) = current;
        Ok(())
    }

    fn verified_binary(&self) -> Option<VerifiedBinary> {
        self.verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn workspace_root(&self, directory: &Path) -> Result<Option<PathBuf>, BazelError> {
        let args = ["info", "workspace"].map(String::from);
        let lines = self
            .runner
            .output_lines(ConsoleType::System, directory, &args, all_lines)
            .await?;
        Ok(lines.into_iter().next().map(PathBuf::from))
    }
}

impl std::fmt::Debug for BazelCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BazelCommand")
            .field("bazel", &self.bazel_path())
            .field("aspect", &self.aspect)
            .finish_non_exhaustive()
    }
}
