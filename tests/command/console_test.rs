//! Tests for console selection and titles.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use bazel_driver::command::{
    banner, shared_sink, Command, CommandConsole, CommandConsoleFactory, SharedSink,
};

/// Console capturing both channels into one buffer.
struct RecordingConsole {
    output: Arc<Mutex<Vec<u8>>>,
}

impl CommandConsole for RecordingConsole {
    fn create_output_stream(&self) -> SharedSink {
        self.output.clone()
    }

    fn create_error_stream(&self) -> SharedSink {
        self.output.clone()
    }
}

#[derive(Default)]
struct RecordingFactory {
    opened: Mutex<Vec<(String, String)>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl RecordingFactory {
    fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().unwrap().clone()
    }

    fn output(&self) -> String {
        String::from_utf8(self.output.lock().unwrap().clone()).unwrap()
    }
}

impl CommandConsoleFactory for RecordingFactory {
    fn get(&self, name: &str, title: &str) -> io::Result<Arc<dyn CommandConsole>> {
        self.opened
            .lock()
            .unwrap()
            .push((name.to_string(), title.to_string()));
        self.output
            .lock()
            .unwrap()
            .extend_from_slice(banner(title).as_bytes());
        Ok(Arc::new(RecordingConsole {
            output: self.output.clone(),
        }))
    }
}

#[tokio::test]
async fn named_console_gets_title_and_unselected_output() {
    let factory = Arc::new(RecordingFactory::default());
    let mut command = Command::builder()
        .console_factory(factory.clone())
        .console_name(Some("Bazel [system]".to_string()))
        .directory("/")
        .args(["sh", "-c", "echo keep; echo show"])
        .stdout_selector(|line| (line == "keep").then(|| line.to_string()))
        .build()
        .unwrap();

    assert_eq!(
        factory.opened(),
        [(
            "Bazel [system]".to_string(),
            "Running sh -c echo keep; echo show from /".to_string()
        )]
    );

    assert_eq!(command.run().await.unwrap(), 0);
    assert_eq!(command.selected_output_lines(), ["keep"]);
    assert_eq!(
        factory.output(),
        "*** Running sh -c echo keep; echo show from / ***\nshow\n"
    );
}

#[tokio::test]
async fn unnamed_command_opens_no_console() {
    let factory = Arc::new(RecordingFactory::default());
    let mut command = Command::builder()
        .console_factory(factory.clone())
        .console_name(None)
        .args(["sh", "-c", "echo hidden"])
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 0);
    assert!(factory.opened().is_empty());
    assert!(factory.output().is_empty());
}

#[tokio::test]
async fn explicit_sink_overrides_console() {
    let factory = Arc::new(RecordingFactory::default());
    let own = Arc::new(Mutex::new(Vec::new()));
    let mut command = Command::builder()
        .console_factory(factory.clone())
        .console_name(Some("Bazel [/ws]".to_string()))
        .directory(Path::new("/"))
        .args(["sh", "-c", "echo out; echo err >&2"])
        .stdout(own.clone())
        .build()
        .unwrap();

    assert_eq!(command.run().await.unwrap(), 0);
    assert_eq!(String::from_utf8(own.lock().unwrap().clone()).unwrap(), "out\n");
    assert!(factory.output().ends_with("err\n"));
    assert!(!factory.output().contains("out\n"));
}

#[test]
fn shared_sink_wraps_any_writer() {
    let sink = shared_sink(io::sink());
    sink.lock().unwrap().write_all(b"ignored").unwrap();
}
