//! The command capability implemented by loadable modules.

use crate::error::ShellError;
use crate::registry::CommandRegistry;
use crate::state::SessionState;

/// What a command hands back: the state for the next line and, optionally,
/// an error to report.
///
/// Both parts are always present, so a command may change the state and
/// still report a failure.
#[derive(Debug)]
pub struct Outcome {
    /// State adopted for the next line.
    pub state: SessionState,
    /// Error printed to the error stream, if any.
    pub error: Option<ShellError>,
}

impl Outcome {
    /// Successful completion.
    pub fn ok(state: SessionState) -> Self {
        Self { state, error: None }
    }

    /// Completion with an error.
    pub fn err(state: SessionState, error: ShellError) -> Self {
        Self {
            state,
            error: Some(error),
        }
    }

    /// Split into state and `Result`.
    pub fn into_parts(self) -> (SessionState, Result<(), ShellError>) {
        match self.error {
            Some(e) => (self.state, Err(e)),
            None => (self.state, Ok(())),
        }
    }
}

/// A single command invocation.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    args: &'a [String],
    registry: &'a CommandRegistry,
}

impl<'a> Invocation<'a> {
    /// Build an invocation. `args[0]` is the command name.
    pub fn new(args: &'a [String], registry: &'a CommandRegistry) -> Self {
        Self { args, registry }
    }

    /// All tokens of the line, the command name first.
    pub fn args(&self) -> &'a [String] {
        self.args
    }

    /// The name the command was invoked under.
    pub fn name(&self) -> &'a str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// Tokens after the command name.
    pub fn params(&self) -> &'a [String] {
        self.args.get(1..).unwrap_or(&[])
    }

    /// Read-only view of every registered command.
    pub fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }
}

/// A named, invocable unit of the shell.
///
/// Commands run one at a time on the session loop. A command owns the
/// state it receives and must hand back the state for the next line.
pub trait Command: Send + Sync {
    /// Run the command.
    fn execute(&self, state: SessionState, invocation: &Invocation<'_>) -> Outcome;

    /// One-line description, if the command has one.
    fn summary(&self) -> Option<&str> {
        None
    }
}

impl<F> Command for F
where
    F: Fn(SessionState, &Invocation<'_>) -> Outcome + Send + Sync,
{
    fn execute(&self, state: SessionState, invocation: &Invocation<'_>) -> Outcome {
        self(state, invocation)
    }
}
