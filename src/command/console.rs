//! Consoles receiving the unselected output of commands.

use std::io::{self, Write};
use std::sync::Arc;

use owo_colors::OwoColorize;

use super::select::{shared_sink, SharedSink};

/// An output console able to provide sinks for both output channels of a
/// command.
pub trait CommandConsole: Send + Sync {
    /// Create a sink suitable for the standard output of a command.
    fn create_output_stream(&self) -> SharedSink;

    /// Create a sink suitable for the standard error of a command.
    fn create_error_stream(&self) -> SharedSink;
}

/// Factory returning consoles by name.
pub trait CommandConsoleFactory: Send + Sync {
    /// Return the console called `name`, writing `title` at its top as
    /// `*** <title> ***`.
    ///
    /// # Errors
    ///
    /// Returns an error if the banner cannot be written.
    fn get(&self, name: &str, title: &str) -> io::Result<Arc<dyn CommandConsole>>;
}

/// Format the banner written when a console is handed out.
#[must_use]
pub fn banner(title: &str) -> String {
    format!("*** {title} ***\n")
}

/// Console writing to the terminal of the current process.
///
/// Standard output goes to stdout, standard error is printed in red on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioConsole;

impl CommandConsole for StdioConsole {
    fn create_output_stream(&self) -> SharedSink {
        shared_sink(io::stdout())
    }

    fn create_error_stream(&self) -> SharedSink {
        shared_sink(RedWriter(io::stderr()))
    }
}

/// Factory handing out [`StdioConsole`]s. The banner goes to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioConsoleFactory;

impl CommandConsoleFactory for StdioConsoleFactory {
    fn get(&self, name: &str, title: &str) -> io::Result<Arc<dyn CommandConsole>> {
        tracing::trace!(console = %name, "Opening console");
        let mut stderr = io::stderr().lock();
        write!(stderr, "{}", banner(title).dimmed())?;
        Ok(Arc::new(StdioConsole))
    }
}

struct RedWriter<W>(W);

impl<W: Write> Write for RedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write!(self.0, "{}", String::from_utf8_lossy(buf).red())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
