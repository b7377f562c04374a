//! Line-selecting output stream.
//!
//! [`SelectOutputStream`] buffers the bytes written to it into lines and hands
//! each complete line to a selector. Selected lines are kept in memory, the
//! others are forwarded untouched to an optional downstream sink.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use super::error::CommandError;

/// Per-line classifier.
///
/// Returns `Some(value)` to claim the line (the value is stored and the line is
/// not forwarded) or `None` to let the line pass through to the sink. Claiming
/// a line with an empty value drops it entirely.
pub type LineSelector = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A sink shared between writers. Each forwarded line is written while holding
/// the lock, so two streams sharing a sink never interleave mid-line.
pub type SharedSink = Arc<Mutex<dyn Write + Send>>;

/// Wrap a writer into a [`SharedSink`].
pub fn shared_sink<W: Write + Send + 'static>(writer: W) -> SharedSink {
    Arc::new(Mutex::new(writer))
}

/// Output stream that splits its input in lines and routes them through a
/// [`LineSelector`].
///
/// If no selector is set, every line is forwarded. If no sink is set,
/// unselected lines are discarded.
pub struct SelectOutputStream {
    output: Option<SharedSink>,
    selector: Option<LineSelector>,
    closed: bool,
    lines: Vec<String>,
    buffer: Vec<u8>,
}

impl SelectOutputStream {
    /// Create a stream forwarding unselected lines to `output`.
    #[must_use]
    pub fn new(output: Option<SharedSink>, selector: Option<LineSelector>) -> Self {
        Self {
            output,
            selector,
            closed: false,
            lines: Vec::new(),
            buffer: Vec::new(),
        }
    }

    /// Flush any unterminated trailing content and close the stream.
    ///
    /// The trailing content is forwarded without a line terminator.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::StreamClosed` if the stream was already closed,
    /// or an I/O error if the trailing content cannot be forwarded.
    pub fn close(&mut self) -> Result<(), CommandError> {
        if self.closed {
            return Err(CommandError::StreamClosed);
        }
        self.closed = true;
        if !self.buffer.is_empty() {
            self.select(false)?;
        }
        Ok(())
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Selected lines, in arrival order. Complete only once the stream is closed.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Drop buffered bytes not yet routed. Used once a stream has failed so
    /// that `close` does not route a half-processed line again.
    pub(crate) fn discard_pending(&mut self) {
        self.buffer.clear();
    }

    fn select(&mut self, append_newline: bool) -> io::Result<()> {
        let result = self.route_buffer(append_newline);
        self.buffer.clear();
        result
    }

    fn route_buffer(&mut self, append_newline: bool) -> io::Result<()> {
        let selected = match &self.selector {
            Some(selector) => selector(&String::from_utf8_lossy(&self.buffer)),
            None => None,
        };

        match selected {
            Some(line) => {
                if !line.is_empty() {
                    self.lines.push(line);
                }
                Ok(())
            }
            None => {
                let Some(output) = &self.output else {
                    return Ok(());
                };
                if append_newline {
                    self.buffer.push(b'\n');
                }
                let mut sink = output.lock().unwrap_or_else(PoisonError::into_inner);
                sink.write_all(&self.buffer)
            }
        }
    }
}

impl Write for SelectOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other(CommandError::StreamClosed));
        }

        let mut rest = buf;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.buffer.extend_from_slice(&rest[..pos]);
            self.select(true)?;
            rest = &rest[pos + 1..];
        }
        self.buffer.extend_from_slice(rest);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.output {
            Some(output) => output
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SelectOutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectOutputStream")
            .field("has_output", &self.output.is_some())
            .field("has_selector", &self.selector.is_some())
            .field("closed", &self.closed)
            .field("lines", &self.lines)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
