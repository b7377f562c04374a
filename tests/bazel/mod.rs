//! Bazel driver tests against a scripted binary.

mod session_test;

/// Verify the public Bazel types are exported from the library.
#[test]
fn test_all_bazel_types_exported() {
    use bazel_driver::bazel::{
        compare_versions, AspectLocation, BazelCommand, BazelError, BazelNotFoundError,
        BazelVersion, ErrorKind, ARTIFACT_MARKER, MINIMUM_BAZEL_VERSION,
    };
    use bazel_driver::build_info::{BuildInfo, BuildInfoError, BuildInfoMap, Jars};

    let _ = BazelCommand::new(AspectLocation::new("/aspect", "//:a.bzl%a"), None);
    let _: BazelError = BazelNotFoundError::NotSet.into();
    assert_eq!(
        BazelError::from(BazelNotFoundError::NotSet).kind(),
        ErrorKind::NotConfigured
    );
    assert!(BazelVersion::parse("6.4.0").is_some());
    assert_eq!(
        compare_versions(&MINIMUM_BAZEL_VERSION, &[0, 5, 0]),
        std::cmp::Ordering::Equal
    );
    assert_eq!(ARTIFACT_MARKER, ">>>");
    let _ = BuildInfoMap::new();
    let _: Option<BuildInfo> = None;
    let _: Option<BuildInfoError> = None;
    let _ = Jars::new("a.jar", None);
}
