//! Tests for running processes and routing their output.

use std::sync::{Arc, Mutex};

use bazel_driver::bazel::select_build_info_artifact;
use bazel_driver::command::{Command, SharedSink};

fn buffer() -> (Arc<Mutex<Vec<u8>>>, SharedSink) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink: SharedSink = buffer.clone();
    (buffer, sink)
}

fn contents(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(buffer.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn artifact_lines_are_selected_and_warnings_forwarded() {
    let (stderr, sink) = buffer();
    let mut command = Command::builder()
        .args([
            "sh",
            "-c",
            "echo '>>>/root/out/pkg.e4b-build.json' >&2; echo '>>>/root/out/pkg.jar' >&2; echo 'WARNING: x' >&2",
        ])
        .stderr(sink)
        .stderr_selector(select_build_info_artifact)
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 0);
    assert_eq!(
        command.selected_error_lines(),
        ["/root/out/pkg.e4b-build.json"]
    );
    assert_eq!(contents(&stderr), "WARNING: x\n");
}

#[tokio::test]
async fn unterminated_last_line_is_forwarded_as_is() {
    let (stdout, sink) = buffer();
    let mut command = Command::builder()
        .args(["printf", "one\ntwo"])
        .stdout(sink)
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 0);
    assert_eq!(contents(&stdout), "one\ntwo");
    assert!(command.selected_output_lines().is_empty());
}

#[tokio::test]
async fn channels_are_selected_independently() {
    let mut command = Command::builder()
        .args(["sh", "-c", "echo out1; echo err1 >&2; echo out2; echo err2 >&2"])
        .stdout_selector(|line| Some(line.to_uppercase()))
        .stderr_selector(|line| line.ends_with('2').then(|| line.to_string()))
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 0);
    assert_eq!(command.selected_output_lines(), ["OUT1", "OUT2"]);
    assert_eq!(command.selected_error_lines(), ["err2"]);
}

#[tokio::test]
async fn panicking_selector_does_not_lose_the_other_channel() {
    let mut command = Command::builder()
        .args(["sh", "-c", "echo out1; echo err1 >&2; echo out2; exit 4"])
        .stdout_selector(|line| Some(line.to_string()))
        .stderr_selector(|_: &str| -> Option<String> { panic!("selector failure") })
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 4);
    assert_eq!(command.selected_output_lines(), ["out1", "out2"]);
    assert!(command.selected_error_lines().is_empty());
}

#[tokio::test]
async fn runs_in_the_given_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let expected = std::fs::canonicalize(dir.path()).unwrap();
    let mut command = Command::builder()
        .directory(dir.path())
        .args(["sh", "-c", "pwd -P"])
        .stdout_selector(|line| Some(line.to_string()))
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 0);
    assert_eq!(
        command.selected_output_lines(),
        [expected.to_string_lossy().into_owned()]
    );
}

#[tokio::test]
async fn killed_process_reports_signal_code() {
    let mut command = Command::builder()
        .args(["sh", "-c", "kill -9 $$"])
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 128 + 9);
}

struct BrokenSink;

impl std::io::Write for BrokenSink {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("console closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

const LATE_STDERR: &str = "echo err1 >&2; sleep 0.3; echo err2 >&2; echo out2; exit 4";

#[tokio::test]
async fn panicking_selector_keeps_draining_its_channel() {
    let mut command = Command::builder()
        .args(["sh", "-c", LATE_STDERR])
        .stdout_selector(|line| Some(line.to_string()))
        .stderr_selector(|_: &str| -> Option<String> { panic!("selector failure") })
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 4);
    assert_eq!(command.selected_output_lines(), ["out2"]);
    assert!(command.selected_error_lines().is_empty());
}

#[tokio::test]
async fn failing_sink_keeps_draining_its_channel() {
    let mut command = Command::builder()
        .args(["sh", "-c", LATE_STDERR])
        .stdout_selector(|line| Some(line.to_string()))
        .stderr(Arc::new(Mutex::new(BrokenSink)))
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 4);
    assert_eq!(command.selected_output_lines(), ["out2"]);
}

#[tokio::test]
async fn lines_selected_before_a_failure_are_kept() {
    let mut command = Command::builder()
        .args(["sh", "-c", "echo keep >&2; sleep 0.3; echo boom >&2; echo later >&2; exit 2"])
        .stderr_selector(|line: &str| {
            assert_ne!(line, "boom", "selector failure");
            Some(line.to_string())
        })
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 2);
    assert_eq!(command.selected_error_lines(), ["keep"]);
}
