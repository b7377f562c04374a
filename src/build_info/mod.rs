//! Decoding of the build metadata artifacts written by the IDE aspect.
//!
//! The aspect writes one JSON file per visited target. A batch of such files
//! is decoded into a [`BuildInfoMap`] keyed by target label; a single bad file
//! fails the whole batch.

mod error;
mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use error::BuildInfoError;
pub use types::{BuildInfo, Jars};

/// Build metadata keyed by target label.
pub type BuildInfoMap = BTreeMap<String, BuildInfo>;

/// Suffix of the metadata files written by the IDE aspect.
pub const BUILD_INFO_SUFFIX: &str = ".e4b-build.json";

/// Read and decode one metadata file.
///
/// # Errors
///
/// Returns `BuildInfoError::Read` if the file cannot be read, or
/// `BuildInfoError::Parse` if it does not hold a complete record.
pub async fn read_build_info(path: &Path) -> Result<BuildInfo, BuildInfoError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BuildInfoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    BuildInfo::from_json(&content).map_err(|source| BuildInfoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a batch of metadata files.
///
/// Relative paths are resolved against `base`, usually the execution root.
///
/// # Errors
///
/// Returns the first `BuildInfoError` met; no partial map is returned.
pub async fn load_build_infos<P: AsRef<str>>(
    paths: &[P],
    base: &Path,
) -> Result<BuildInfoMap, BuildInfoError> {
    let mut infos = BuildInfoMap::new();
    for path in paths {
        let path = resolve(path.as_ref(), base);
        let info = read_build_info(&path).await?;
        tracing::trace!(label = %info.label, path = %path.display(), "Decoded build metadata");
        infos.insert(info.label.clone(), info);
    }
    Ok(infos)
}

fn resolve(path: &str, base: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
