//! The shell session: module loading plus the read, dispatch, adopt loop.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::Outcome;
use crate::dispatch;
use crate::error::Result;
use crate::input::LineReader;
use crate::loader::{self, DylibBinder, LoadReport, ModuleBinder};
use crate::phase::LoopPhase;
use crate::registry::CommandRegistry;
use crate::state::SessionState;

/// Fires once the session loop has shut down.
#[derive(Debug, Clone)]
pub struct Closed(CancellationToken);

impl Closed {
    /// Wait until the loop has closed.
    pub async fn wait(&self) {
        self.0.cancelled().await
    }

    /// Whether the loop has closed.
    pub fn is_closed(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Long-lived owner of the command registry and the session loop.
pub struct Shell {
    plugins_dir: PathBuf,
    registry: CommandRegistry,
    report: LoadReport,
    phase: LoopPhase,
    closed: CancellationToken,
}

impl Shell {
    /// Create a shell that loads modules from `plugins_dir`.
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            registry: CommandRegistry::new(),
            report: LoadReport::default(),
            phase: LoopPhase::default(),
            closed: CancellationToken::new(),
        }
    }

    /// Load every module from the plugins directory as a dynamic library.
    ///
    /// Fails only if the plugins directory is missing or unreadable.
    pub fn init(&mut self, state: SessionState) -> Result<SessionState> {
        self.init_with(&DylibBinder, state)
    }

    /// Load every module from the plugins directory through `binder`.
    pub fn init_with<B>(&mut self, binder: &B, state: SessionState) -> Result<SessionState>
    where
        B: ModuleBinder + ?Sized,
    {
        let loaded = loader::load_all(&self.plugins_dir, state, binder)?;
        info!(
            dir = %self.plugins_dir.display(),
            commands = loaded.registry.len(),
            modules = loaded.report.loaded.len(),
            skipped = loaded.report.skipped.len(),
            "shell initialized"
        );

        self.registry = loaded.registry;
        self.report = loaded.report;
        Ok(loaded.state)
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Read-only view of the loaded commands.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// What happened to each module during [`init`](Self::init).
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Current phase of the session loop.
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Handle that fires once the loop has closed.
    pub fn closed(&self) -> Closed {
        Closed(self.closed.clone())
    }

    /// Run one line against the registry.
    pub fn dispatch(&self, state: SessionState, line: &str) -> Outcome {
        dispatch::dispatch(&self.registry, state, line)
    }

    /// Run the session loop until `cancel` fires or input ends.
    ///
    /// Each cycle prints the current prompt, reads one line, dispatches it
    /// and adopts the returned state. Errors from a line are written to the
    /// state's error stream and never end the loop. Cancellation is only
    /// observed while waiting for input; a running command finishes first.
    ///
    /// Returns the final session state.
    pub async fn open(
        &mut self,
        mut state: SessionState,
        cancel: CancellationToken,
    ) -> Result<SessionState> {
        let mut reader = LineReader::spawn()?;
        self.phase.transition_to(LoopPhase::Idle)?;

        loop {
            self.phase.transition_to(LoopPhase::AwaitingInput)?;

            let line = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("session cancelled");
                    None
                }

                line = reader.next_line(&state) => {
                    if line.is_none() {
                        info!("input closed");
                    }
                    line
                }
            };

            let Some(line) = line else {
                self.close()?;
                return Ok(state);
            };

            self.phase.transition_to(LoopPhase::Dispatching)?;
            let outcome = self.dispatch(state, &line);
            state = outcome.state;
            if let Some(err) = outcome.error {
                debug!(error = %err, "line failed");
                if let Err(e) = state.stderr().write_line(&err.to_string()) {
                    warn!(error = %e, "failed to report command error");
                }
            }
            self.phase.transition_to(LoopPhase::Idle)?;
        }
    }

    /// Move to `Closed` and mark the closed signal.
    ///
    /// The signal is only marked on a valid transition, so it can never be
    /// marked twice.
    fn close(&mut self) -> Result<()> {
        self.phase.transition_to(LoopPhase::Closed)?;
        self.closed.cancel();
        Ok(())
    }
}
