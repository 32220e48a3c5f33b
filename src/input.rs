//! Cancellable line reads over a blocking input stream.
//!
//! Reads happen on one dedicated OS thread for the whole session. The
//! session loop asks for a line, then awaits the answer alongside its
//! cancellation token. Awaiting is cancel-safe: if the loop stops waiting,
//! a read that is still blocked simply never gets collected.
//!
//! The thread is detached rather than run on tokio's blocking pool, since
//! runtime shutdown waits for blocking tasks and a read on a terminal may
//! never return.

use std::io::ErrorKind;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::sink::{Input, Output};
use crate::state::SessionState;

/// One read, described by the state current at the time it was asked for.
struct ReadRequest {
    prompt: String,
    input: Input,
    stdout: Output,
    stderr: Output,
}

impl ReadRequest {
    fn from_state(state: &SessionState) -> Self {
        Self {
            prompt: state.prompt().to_string(),
            input: state.stdin().clone(),
            stdout: state.stdout().clone(),
            stderr: state.stderr().clone(),
        }
    }

    /// Print the prompt and read one line, retrying on read errors.
    ///
    /// Returns `None` at end of input.
    fn run(&self) -> Option<String> {
        loop {
            if let Err(e) = self.stdout.write_str(&format!("{} ", self.prompt)) {
                warn!(error = %e, "failed to write prompt");
            }

            match self.input.read_line() {
                Ok(Some(line)) => {
                    trace!(bytes = line.len(), "input reader: read line");
                    return Some(line);
                }
                Ok(None) => {
                    debug!("input reader: EOF");
                    return None;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "input reader error, retrying");
                    if let Err(e) = self.stderr.write_line(&e.to_string()) {
                        warn!(error = %e, "failed to report read error");
                    }
                }
            }
        }
    }
}

/// Long-lived reader serving one line per request.
pub struct LineReader {
    requests: mpsc::UnboundedSender<ReadRequest>,
    lines: mpsc::Receiver<Option<String>>,
    pending: bool,
}

impl LineReader {
    /// Start the reader thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (requests, mut request_rx) = mpsc::unbounded_channel::<ReadRequest>();
        // Single slot: at most one line is ever in flight.
        let (line_tx, lines) = mpsc::channel::<Option<String>>(1);

        thread::Builder::new()
            .name("plugsh-input".into())
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    let line = request.run();
                    let eof = line.is_none();
                    if line_tx.blocking_send(line).is_err() {
                        debug!("input reader: channel closed");
                        break;
                    }
                    if eof {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests,
            lines,
            pending: false,
        })
    }

    /// Read the next line using the prompt and streams of `state`.
    ///
    /// Returns `None` once input is exhausted. If a previous call was
    /// abandoned mid-wait, this collects that read instead of starting a
    /// new one.
    pub async fn next_line(&mut self, state: &SessionState) -> Option<String> {
        if !self.pending {
            if self.requests.send(ReadRequest::from_state(state)).is_err() {
                return None;
            }
            self.pending = true;
        }

        let line = self.lines.recv().await;
        self.pending = false;
        line.flatten()
    }
}
