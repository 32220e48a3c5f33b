//! Shared handles to the session's input and output streams.
//!
//! Both handles are cheap to clone; clones refer to the same underlying
//! stream. This is what lets a [`SessionState`](crate::SessionState) be
//! copied and replaced at every step while the streams stay put.

use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex, MutexGuard};

fn poisoned() -> io::Error {
    io::Error::other("stream lock poisoned")
}

/// A writable stream shared by every copy of a session state.
#[derive(Clone)]
pub struct Output {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    /// Wrap any writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// The process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// The process's standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// An output that discards everything.
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    /// An in-memory output plus a handle for reading back what was written.
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        (Self::new(captured.clone()), captured)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.inner.lock().map_err(|_| poisoned())
    }

    /// Write `text` as-is and flush.
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let mut writer = self.lock()?;
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }

    /// Write `text` followed by a newline and flush.
    pub fn write_line(&self, text: &str) -> io::Result<()> {
        let mut writer = self.lock()?;
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Whether two handles share the same stream.
    pub fn same_stream(&self, other: &Output) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

/// Memory-backed buffer filled through an [`Output`] made by
/// [`Output::capture`].
#[derive(Clone, Default)]
pub struct Captured {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Captured {
    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        self.buf
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for Captured {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().map_err(|_| poisoned())?.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A line-oriented input stream shared by every copy of a session state.
#[derive(Clone)]
pub struct Input {
    inner: Arc<Mutex<Box<dyn BufRead + Send>>>,
}

impl Input {
    /// Wrap any buffered reader.
    pub fn new(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(reader))),
        }
    }

    /// The process's standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }

    /// An input holding the given text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(io::Cursor::new(text.into().into_bytes()))
    }

    /// Read one line, including its terminator if present.
    ///
    /// Returns `Ok(None)` at end of input.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut reader = self.inner.lock().map_err(|_| poisoned())?;
        let mut line = String::new();
        match reader.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }

    /// Whether two handles share the same stream.
    pub fn same_stream(&self, other: &Input) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input").finish_non_exhaustive()
    }
}
