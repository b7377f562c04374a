//! Bazel session bound to one workspace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::build_info::{load_build_infos, BuildInfoMap, BUILD_INFO_SUFFIX};

use super::complete::{complete_packages, select_target, wildcard_targets, ROOT_PACKAGE};
use super::error::BazelError;
use super::runner::{all_lines, BazelRunner, ConsoleType};

/// Prefix of the lines announcing an output artifact on standard error.
pub const ARTIFACT_MARKER: &str = ">>>";

/// Separator between the targets of a cache key.
const TARGET_KEY_SEPARATOR: &str = "\n";

/// Pick build metadata files out of the artifact announcements of an analysis
/// build. Other artifact lines are swallowed, anything else passes through.
#[must_use]
pub fn select_build_info_artifact(line: &str) -> Option<String> {
    let path = line.strip_prefix(ARTIFACT_MARKER)?;
    if path.ends_with(BUILD_INFO_SUFFIX) {
        Some(path.to_string())
    } else {
        Some(String::new())
    }
}

/// Build metadata computed so far, keyed by the joined target list.
type BuildInfoCache = HashMap<String, Arc<BuildInfoMap>>;

/// Access to Bazel for one workspace.
///
/// Every operation holds the session lock for its whole duration, so a
/// session runs at most one Bazel command at a time. Sessions of different
/// workspaces are independent.
pub struct BazelInstance {
    runner: Arc<BazelRunner>,
    workspace_root: PathBuf,
    execution_root: PathBuf,
    state: Mutex<BuildInfoCache>,
}

impl BazelInstance {
    pub(crate) async fn new(
        runner: Arc<BazelRunner>,
        workspace_root: PathBuf,
    ) -> Result<Self, BazelError> {
        let args = ["info", "execution_root"].map(String::from);
        let lines = runner
            .output_lines(
                ConsoleType::Workspace(&workspace_root),
                &workspace_root,
                &args,
                all_lines,
            )
            .await?;
        let execution_root = PathBuf::from(lines.concat());
        tracing::debug!(
            workspace = %workspace_root.display(),
            execution_root = %execution_root.display(),
            "Opened Bazel workspace"
        );

        Ok(Self {
            runner,
            workspace_root,
            execution_root,
            state: Mutex::new(BuildInfoCache::new()),
        })
    }

    /// Root of the workspace.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execution root of the workspace, against which relative output paths
    /// resolve.
    #[must_use]
    pub fn execution_root(&self) -> &Path {
        &self.execution_root
    }

    /// List the targets below the given directories.
    ///
    /// # Errors
    ///
    /// Returns an error if Bazel is unusable or cannot be run.
    pub async fn list_targets(&self, directories: &[PathBuf]) -> Result<Vec<String>, BazelError> {
        let _guard = self.state.lock().await;
        let mut args = vec!["query".to_string()];
        for directory in directories {
            let relative = directory
                .strip_prefix(&self.workspace_root)
                .unwrap_or(directory);
            args.push(format!("{}/...", relative.display()));
        }
        self.run_for_lines(&args).await
    }

    /// Build metadata for `targets`, computed by an analysis build with the
    /// IDE aspect.
    ///
    /// Results are cached per target list (order matters) until
    /// [`mark_as_dirty`](Self::mark_as_dirty) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if Bazel is unusable or cannot be run, or if any
    /// metadata file is malformed. Nothing is cached on error.
    pub async fn get_build_info<S: AsRef<str>>(
        &self,
        targets: &[S],
    ) -> Result<Arc<BuildInfoMap>, BazelError> {
        let targets: Vec<String> = targets.iter().map(|t| t.as_ref().to_string()).collect();
        let key = targets.join(TARGET_KEY_SEPARATOR);

        let mut cache = self.state.lock().await;
        if let Some(infos) = cache.get(&key) {
            tracing::debug!(targets = ?targets, "Build metadata cache hit");
            return Ok(Arc::clone(infos));
        }

        tracing::debug!(targets = ?targets, "Build metadata cache miss");
        let files = self.build_ide_info(targets).await?;
        let infos = Arc::new(load_build_infos(&files, &self.execution_root).await?);
        cache.insert(key, Arc::clone(&infos));
        Ok(infos)
    }

    /// Drop all cached build metadata.
    ///
    /// This clears every target list at once, which may cause redundant
    /// analysis builds when several projects share the workspace.
    pub async fn mark_as_dirty(&self) {
        let mut cache = self.state.lock().await;
        tracing::debug!(entries = cache.len(), "Clearing build metadata cache");
        cache.clear();
    }

    /// Build `targets`. The exit code is returned as is.
    ///
    /// # Errors
    ///
    /// Returns an error if Bazel is unusable or cannot be run.
    pub async fn build<S: AsRef<str>, A: AsRef<str>>(
        &self,
        targets: &[S],
        extra_args: &[A],
    ) -> Result<i32, BazelError> {
        self.run_with_targets("build", targets, extra_args).await
    }

    /// Test `targets`. The exit code is returned as is.
    ///
    /// # Errors
    ///
    /// Returns an error if Bazel is unusable or cannot be run.
    pub async fn test<S: AsRef<str>, A: AsRef<str>>(
        &self,
        targets: &[S],
        extra_args: &[A],
    ) -> Result<i32, BazelError> {
        self.run_with_targets("test", targets, extra_args).await
    }

    /// Completions for a target pattern starting with `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if completing a target name needs Bazel and Bazel is
    /// unusable or cannot be run.
    pub async fn complete(&self, input: &str) -> Result<Vec<String>, BazelError> {
        let _guard = self.state.lock().await;

        if input.is_empty() || input == "/" {
            return Ok(vec![ROOT_PACKAGE.to_string()]);
        }

        if let Some((package, prefix)) = input.split_once(':') {
            let args = ["query".to_string(), format!("{package}:*")];
            let selector_package = package.to_string();
            let selector_prefix = prefix.to_string();
            let mut completions = self
                .runner
                .output_lines(
                    ConsoleType::NoConsole,
                    &self.workspace_root,
                    &args,
                    move |line| select_target(&selector_package, &selector_prefix, line),
                )
                .await?;
            completions.extend(wildcard_targets(package, prefix));
            return Ok(completions);
        }

        Ok(complete_packages(&self.workspace_root, input))
    }

    async fn build_ide_info(&self, targets: Vec<String>) -> Result<Vec<String>, BazelError> {
        let mut args = vec!["build".to_string()];
        args.extend_from_slice(self.runner.aspect_options());
        args.extend(targets);
        self.runner
            .error_lines(
                ConsoleType::Workspace(&self.workspace_root),
                &self.workspace_root,
                &args,
                select_build_info_artifact,
            )
            .await
    }

    async fn run_with_targets<S: AsRef<str>, A: AsRef<str>>(
        &self,
        subcommand: &str,
        targets: &[S],
        extra_args: &[A],
    ) -> Result<i32, BazelError> {
        let _guard = self.state.lock().await;
        let mut args = vec![subcommand.to_string()];
        args.extend_from_slice(self.runner.build_options());
        args.extend(extra_args.iter().map(|a| a.as_ref().to_string()));
        args.push("--".to_string());
        args.extend(targets.iter().map(|t| t.as_ref().to_string()));

        let code = self
            .runner
            .run(
                ConsoleType::Workspace(&self.workspace_root),
                &self.workspace_root,
                &args,
            )
            .await?;
        tracing::info!(subcommand, code, workspace = %self.workspace_root.display(), "Bazel finished");
        Ok(code)
    }

    async fn run_for_lines(&self, args: &[String]) -> Result<Vec<String>, BazelError> {
        self.runner
            .output_lines(
                ConsoleType::Workspace(&self.workspace_root),
                &self.workspace_root,
                args,
                all_lines,
            )
            .await
    }
}

impl std::fmt::Debug for BazelInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BazelInstance")
            .field("workspace_root", &self.workspace_root)
            .field("execution_root", &self.execution_root)
            .finish_non_exhaustive()
    }
}
