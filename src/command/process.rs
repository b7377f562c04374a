//! Process spawning with per-channel line selection.
//!
//! A [`Command`] runs one external process to completion. Each of its output
//! channels is copied by its own task into a [`SelectOutputStream`], so lines
//! can be captured by a selector while the rest is forwarded to a console.

use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use super::console::CommandConsoleFactory;
use super::error::CommandError;
use super::select::{LineSelector, SelectOutputStream, SharedSink};

/// Size of the buffer used by each reader task.
const COPY_BUFFER_SIZE: usize = 4096;

/// Builder for [`Command`].
///
/// The first argument added is the program to run.
pub struct CommandBuilder {
    console_factory: Option<Arc<dyn CommandConsoleFactory>>,
    console_name: Option<String>,
    directory: PathBuf,
    args: Vec<String>,
    stdout: Option<SharedSink>,
    stderr: Option<SharedSink>,
    stdout_selector: Option<LineSelector>,
    stderr_selector: Option<LineSelector>,
}

impl CommandBuilder {
    /// Create a builder running in the current working directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            console_factory: None,
            console_name: None,
            directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            args: Vec::new(),
            stdout: None,
            stderr: None,
            stdout_selector: None,
            stderr_selector: None,
        }
    }

    /// Set the factory used to look up the console named by
    /// [`console_name`](Self::console_name).
    #[must_use]
    pub fn console_factory(mut self, factory: Arc<dyn CommandConsoleFactory>) -> Self {
        self.console_factory = Some(factory);
        self
    }

    /// Set the console receiving unselected lines.
    ///
    /// Explicit sinks set with [`stdout`](Self::stdout) or
    /// [`stderr`](Self::stderr) take precedence over the console for their
    /// channel. Without a console name nothing is written to any console.
    #[must_use]
    pub fn console_name(mut self, name: Option<String>) -> Self {
        self.console_name = name;
        self
    }

    /// Set the working directory of the process.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Add one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Send unselected standard output lines to `sink`.
    #[must_use]
    pub fn stdout(mut self, sink: SharedSink) -> Self {
        self.stdout = Some(sink);
        self
    }

    /// Send unselected standard error lines to `sink`.
    #[must_use]
    pub fn stderr(mut self, sink: SharedSink) -> Self {
        self.stderr = Some(sink);
        self
    }

    /// Capture standard output lines for which `selector` returns a value.
    #[must_use]
    pub fn stdout_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.stdout_selector = Some(Arc::new(selector));
        self
    }

    /// Capture standard error lines for which `selector` returns a value.
    #[must_use]
    pub fn stderr_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.stderr_selector = Some(Arc::new(selector));
        self
    }

    /// Build the command, opening its console if one was named.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::EmptyCommand` if no argument was added, or an
    /// I/O error if the console cannot be opened.
    pub fn build(self) -> Result<Command, CommandError> {
        if self.args.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let console = match (&self.console_name, &self.console_factory) {
            (Some(name), Some(factory)) => {
                let title = format!(
                    "Running {} from {}",
                    self.args.join(" "),
                    self.directory.display()
                );
                Some(factory.get(name, &title)?)
            }
            _ => None,
        };

        let stdout = self
            .stdout
            .or_else(|| console.as_ref().map(|c| c.create_output_stream()));
        let stderr = self
            .stderr
            .or_else(|| console.as_ref().map(|c| c.create_error_stream()));

        Ok(Command {
            directory: self.directory,
            args: self.args,
            stdout: SelectOutputStream::new(stdout, self.stdout_selector),
            stderr: SelectOutputStream::new(stderr, self.stderr_selector),
            executed: false,
        })
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("console_name", &self.console_name)
            .field("directory", &self.directory)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A single-use external command.
#[derive(Debug)]
pub struct Command {
    directory: PathBuf,
    args: Vec<String>,
    stdout: SelectOutputStream,
    stderr: SelectOutputStream,
    executed: bool,
}

impl Command {
    /// Create a [`CommandBuilder`].
    #[must_use]
    pub fn builder() -> CommandBuilder {
        CommandBuilder::new()
    }

    /// Run the process to completion and return its exit code.
    ///
    /// Both output channels are fully copied and their streams closed before
    /// this returns. A failure while copying one channel, including a
    /// panicking selector, only stops selection on that channel: the rest of
    /// its output is drained and discarded, and the exit code is still
    /// returned. A process killed by a signal reports `128 + signal`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::AlreadyExecuted` on a second call,
    /// `CommandError::Spawn` if the process cannot be started, or an I/O error
    /// if waiting for it fails.
    pub async fn run(&mut self) -> Result<i32, CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        self.executed = true;

        let (program, args) = self.args.split_first().ok_or(CommandError::EmptyCommand)?;
        tracing::debug!(
            program = %program,
            args = ?args,
            dir = %self.directory.display(),
            "Spawning command"
        );

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stderr_task = spawn_copy("stderr", child.stderr.take(), take_stream(&mut self.stderr));
        let stdout_task = spawn_copy("stdout", child.stdout.take(), take_stream(&mut self.stdout));

        let status = child.wait().await?;

        self.stderr = join_copy("stderr", stderr_task).await;
        self.stdout = join_copy("stdout", stdout_task).await;
        close_stream("stderr", &mut self.stderr);
        close_stream("stdout", &mut self.stdout);

        let code = exit_code(status);
        tracing::debug!(program = %program, code, "Command exited");
        Ok(code)
    }

    /// Lines captured from standard output by its selector.
    #[must_use]
    pub fn selected_output_lines(&self) -> &[String] {
        self.stdout.lines()
    }

    /// Lines captured from standard error by its selector.
    #[must_use]
    pub fn selected_error_lines(&self) -> &[String] {
        self.stderr.lines()
    }

    /// The full command line, program first.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The working directory of the process.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn take_stream(stream: &mut SelectOutputStream) -> SelectOutputStream {
    std::mem::replace(stream, SelectOutputStream::new(None, None))
}

fn spawn_copy<R>(
    channel: &'static str,
    reader: Option<R>,
    stream: SelectOutputStream,
) -> JoinHandle<SelectOutputStream>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match reader {
            Some(reader) => copy_stream(channel, reader, stream).await,
            None => stream,
        }
    })
}

// A failed channel keeps reading until EOF so the child never hits a closed
// pipe; the other channel and the exit code are unaffected.
async fn copy_stream<R>(
    channel: &'static str,
    mut reader: R,
    mut stream: SelectOutputStream,
) -> SelectOutputStream
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut failed = false;
    loop {
        let read = match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) => {
                tracing::warn!(channel, error = %e, "Failed to read command output");
                break;
            }
        };
        if failed {
            continue;
        }
        let chunk = &buffer[..read];
        match panic::catch_unwind(AssertUnwindSafe(|| stream.write_all(chunk))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(channel, error = %e, "Failed to forward command output, discarding the rest");
                failed = true;
            }
            Err(_) => {
                tracing::warn!(channel, "Line selector panicked, discarding the rest of the output");
                failed = true;
            }
        }
        if failed {
            stream.discard_pending();
        }
    }
    stream
}

async fn join_copy(
    channel: &'static str,
    task: JoinHandle<SelectOutputStream>,
) -> SelectOutputStream {
    match task.await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(channel, error = %e, "Output reader task failed");
            SelectOutputStream::new(None, None)
        }
    }
}

fn close_stream(channel: &'static str, stream: &mut SelectOutputStream) {
    if let Err(e) = stream.close() {
        tracing::warn!(channel, error = %e, "Failed to flush command output");
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(-1)
}
