//! Target pattern completion helpers.

use std::path::Path;

/// Completion offered for an empty pattern.
pub const ROOT_PACKAGE: &str = "//";

/// File names marking a directory as a package.
pub const BUILD_FILE_NAMES: [&str; 2] = ["BUILD", "BUILD.bazel"];

/// Prefix of the output symlinks Bazel creates at the workspace root.
pub const CONVENIENCE_SYMLINK_PREFIX: &str = "bazel-";

/// Turn one line of `bazel query <package>:*` into a completion, if the target
/// name starts with `prefix`.
#[must_use]
pub fn select_target(package: &str, prefix: &str, line: &str) -> Option<String> {
    let name = line.split_once(':').map_or(line, |(_, name)| name);
    (!name.is_empty() && name.starts_with(prefix)).then(|| format!("{package}:{name}"))
}

/// The `:all` and `:*` wildcards matching `prefix`.
#[must_use]
pub fn wildcard_targets(package: &str, prefix: &str) -> Vec<String> {
    ["all", "*"]
        .into_iter()
        .filter(|wildcard| wildcard.starts_with(prefix))
        .map(|wildcard| format!("{package}:{wildcard}"))
        .collect()
}

/// Complete a package path from the directories of the workspace.
///
/// The input is split at its last `/` into a fixed prefix and a partial last
/// segment. Every visible sub-directory starting with the partial segment
/// yields `prefix + dir + "/"`, followed by `prefix + dir + ":"` when it holds
/// a BUILD file. `prefix + "..."` is offered when the segment is a prefix of
/// `...`. Directories are listed by name.
#[must_use]
pub fn complete_packages(workspace_root: &Path, input: &str) -> Vec<String> {
    let (prefix, suffix) = match input.rfind('/') {
        Some(idx) if idx > 0 => input.split_at(idx + 1),
        _ => ("", input),
    };

    let directory = if prefix.is_empty() || prefix == ROOT_PACKAGE {
        ""
    } else {
        let start = if input.starts_with(ROOT_PACKAGE) { 2 } else { 0 };
        prefix[start..prefix.len() - 1].trim_start_matches('/')
    };
    let at_root = directory.is_empty();
    let parent = if at_root {
        workspace_root.to_path_buf()
    } else {
        workspace_root.join(directory)
    };

    let mut names: Vec<String> = match std::fs::read_dir(&parent) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| {
                name.starts_with(suffix)
                    && !name.starts_with('.')
                    && !(at_root && name.starts_with(CONVENIENCE_SYMLINK_PREFIX))
            })
            .filter(|name| parent.join(name).is_dir())
            .collect(),
        Err(e) => {
            tracing::debug!(dir = %parent.display(), error = %e, "Cannot list package directory");
            Vec::new()
        }
    };
    names.sort();

    let mut completions = Vec::new();
    for name in names {
        completions.push(format!("{prefix}{name}/"));
        if is_package(&parent.join(&name)) {
            completions.push(format!("{prefix}{name}:"));
        }
    }
    if "...".starts_with(suffix) {
        completions.push(format!("{prefix}..."));
    }
    completions
}

/// Whether `dir` holds a BUILD file.
#[must_use]
pub fn is_package(dir: &Path) -> bool {
    BUILD_FILE_NAMES.iter().any(|name| dir.join(name).is_file())
}
