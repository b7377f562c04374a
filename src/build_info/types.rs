//! Build metadata records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A jar produced by a target, with its optional source jar.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Jars {
    /// Path of the class jar.
    pub jar: String,
    /// Path of the matching source jar, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_jar: Option<String>,
}

impl Jars {
    /// Create a jar pair.
    #[must_use]
    pub fn new(jar: impl Into<String>, source_jar: Option<String>) -> Self {
        Self {
            jar: jar.into(),
            source_jar,
        }
    }
}

/// Build metadata emitted by the IDE aspect for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Label of the target, e.g. `//java/my/pkg:pkg`.
    pub label: String,
    /// Workspace-relative path of the BUILD file defining the target.
    #[serde(rename = "build_file_artifact_location")]
    pub location: String,
    /// Rule kind, e.g. `java_library`.
    pub kind: String,
    /// Source files, in rule order.
    pub sources: Vec<String>,
    /// Labels of the direct dependencies.
    #[serde(rename = "dependencies")]
    pub deps: BTreeSet<String>,
    /// Jars generated by annotation processing.
    pub generated_jars: BTreeSet<Jars>,
    /// Jars produced by the target itself.
    pub jars: BTreeSet<Jars>,
}

impl BuildInfo {
    /// Decode a record from the aspect's JSON output.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a complete record.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
