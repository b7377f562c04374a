//! Tests for version checks and workspace session lookup.

use std::sync::Arc;

use bazel_driver::bazel::{BazelError, BazelNotFoundError, ErrorKind};

use crate::common::{outside_dir, FakeBazel};

#[tokio::test]
async fn supported_version_is_accepted() {
    let fake = FakeBazel::new();
    let version = fake.command().check_version(&fake.script).await.unwrap();
    assert_eq!(version.label(), "6.4.0");
    assert_eq!(version.parts(), [6, 4, 0]);
}

#[tokio::test]
async fn old_version_is_rejected_with_its_label() {
    let fake = FakeBazel::with_version(Some("0.4.5"));
    let err = fake.command().check_version(&fake.script).await.unwrap_err();
    assert_eq!(err, BazelNotFoundError::TooOld("0.4.5".to_string()));
}

#[tokio::test]
async fn missing_version_line_is_unknown() {
    let fake = FakeBazel::with_version(None);
    let err = fake.command().check_version(&fake.script).await.unwrap_err();
    assert_eq!(err, BazelNotFoundError::TooOld("unknown".to_string()));
}

#[tokio::test]
async fn too_old_binary_blocks_sessions() {
    let fake = FakeBazel::with_version(Some("0.4.5"));
    let err = fake.command().get_instance(&fake.workspace).await.unwrap_err();
    assert!(matches!(
        err,
        BazelError::NotFound(BazelNotFoundError::TooOld(_))
    ));
    assert_eq!(err.kind(), ErrorKind::TooOld);
}

#[tokio::test]
async fn sessions_are_shared_per_workspace() {
    let fake = FakeBazel::new();
    let command = fake.command();

    let first = command.get_instance(&fake.workspace).await.unwrap().unwrap();
    let second = command
        .get_instance(&fake.workspace.join("a/b"))
        .await
        .unwrap()
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.workspace_root(), fake.workspace);
    assert_eq!(first.execution_root(), fake.workspace.join("exec"));
    assert_eq!(fake.count("version"), 1);
    assert_eq!(fake.count("info execution_root"), 1);
    assert_eq!(fake.count("info workspace"), 2);
}

#[tokio::test]
async fn cleared_sessions_are_reopened() {
    let fake = FakeBazel::new();
    let command = fake.command();

    let first = command.get_instance(&fake.workspace).await.unwrap().unwrap();
    command.clear_instances().await;
    let second = command.get_instance(&fake.workspace).await.unwrap().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(fake.count("info execution_root"), 2);
}

#[tokio::test]
async fn directory_outside_workspace_has_no_session() {
    let fake = FakeBazel::new();
    let outside = outside_dir();
    let instance = fake.command().get_instance(outside.path()).await.unwrap();
    assert!(instance.is_none());
}

#[tokio::test]
async fn removed_binary_is_reported_at_call_time() {
    let fake = FakeBazel::new();
    let command = fake.command();
    let instance = command.get_instance(&fake.workspace).await.unwrap().unwrap();

    std::fs::remove_file(&fake.script).unwrap();
    let err = instance.complete("//a:").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotExecutable);
}

#[tokio::test]
async fn replaced_binary_is_checked_again() {
    let fake = FakeBazel::new();
    let command = fake.command();
    command.get_instance(&fake.workspace).await.unwrap().unwrap();
    command.get_instance(&fake.workspace).await.unwrap().unwrap();
    assert_eq!(fake.count("version"), 1);

    fake.set_version(Some("0.4.10"));
    let err = command.get_instance(&fake.workspace).await.unwrap_err();

    assert!(matches!(
        err,
        BazelError::NotFound(BazelNotFoundError::TooOld(ref label)) if label == "0.4.10"
    ));
    assert_eq!(fake.count("version"), 2);
}

#[tokio::test]
async fn sessions_of_different_workspaces_run_concurrently() {
    let fake = FakeBazel::new();
    let command = fake.command();
    let first = command.get_instance(&fake.workspace).await.unwrap().unwrap();
    let second = command.get_instance(&fake.workspace2).await.unwrap().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    let no_args: &[&str] = &[];

    let (a, b) = tokio::join!(
        first.build(&["//slow"], no_args),
        second.build(&["//slow"], no_args)
    );

    assert_eq!(a.unwrap(), 0);
    assert_eq!(b.unwrap(), 0);
    let spans = fake.spans();
    assert_eq!(spans.len(), 4);
    assert!(spans[0].starts_with("begin"));
    assert!(spans[1].starts_with("begin"));
}
