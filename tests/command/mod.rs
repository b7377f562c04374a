//! Command runner tests.

mod console_test;
mod run_test;

/// Verify the public command types are exported from the library.
#[test]
fn test_all_command_types_exported() {
    use bazel_driver::command::{
        banner, shared_sink, Command, CommandBuilder, CommandConsole, CommandConsoleFactory,
        CommandError, LineSelector, SelectOutputStream, SharedSink, StdioConsole,
        StdioConsoleFactory,
    };

    let _: CommandBuilder = Command::builder();
    let _: SharedSink = shared_sink(Vec::new());
    let selector: LineSelector = std::sync::Arc::new(|line: &str| Some(line.to_string()));
    let _ = SelectOutputStream::new(None, Some(selector));
    let _: &dyn CommandConsole = &StdioConsole;
    let _: &dyn CommandConsoleFactory = &StdioConsoleFactory;
    let _ = CommandError::EmptyCommand;
    assert_eq!(banner("x"), "*** x ***\n");
}
