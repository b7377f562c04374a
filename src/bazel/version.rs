//! Bazel version parsing and comparison.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

/// Prefix of the line of `bazel version` that carries the version.
pub const VERSION_PREFIX: &str = "Build label: ";

/// Oldest Bazel release this crate works with.
pub const MINIMUM_BAZEL_VERSION: [u32; 3] = [0, 5, 0];

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)([^0-9].*)?$").expect("version pattern is valid")
});

/// A version reported by `bazel version`, e.g. `0.5.2rc1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BazelVersion {
    parts: Vec<u32>,
    label: String,
}

impl BazelVersion {
    /// Parse a build label. Anything after the numeric triple must start with
    /// a non-digit and is ignored for comparison.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let captures = VERSION_PATTERN.captures(label)?;
        let parts = (1..=3)
            .map(|i| captures[i].parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            parts,
            label: label.to_string(),
        })
    }

    /// Numeric components.
    #[must_use]
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    /// The build label this version was parsed from.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this version is at least [`MINIMUM_BAZEL_VERSION`].
    #[must_use]
    pub fn is_supported(&self) -> bool {
        compare_versions(&self.parts, &MINIMUM_BAZEL_VERSION) != Ordering::Less
    }
}

/// Compare two versions component by component.
///
/// Only the common prefix is compared numerically; on a tie the longer
/// version is the greater one.
#[must_use]
pub fn compare_versions(a: &[u32], b: &[u32]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}
