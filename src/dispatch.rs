//! Line parsing and command dispatch.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::command::{Invocation, Outcome};
use crate::error::ShellError;
use crate::registry::CommandRegistry;
use crate::state::SessionState;

/// Split a line into whitespace-separated tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

/// Resolve the first token of `line` and run the matching command.
///
/// - A blank line is a no-op: `state` comes back untouched, no error.
/// - An unknown name returns `state` untouched with
///   [`ShellError::CommandNotFound`].
/// - Otherwise the command's outcome is returned verbatim.
///
/// A panicking command is reported as [`ShellError::Panicked`] and the
/// state from before the call is kept.
pub fn dispatch(registry: &CommandRegistry, state: SessionState, line: &str) -> Outcome {
    let line = line.trim();
    if line.is_empty() {
        return Outcome::ok(state);
    }

    let args = tokenize(line);
    let Some(name) = args.first() else {
        return Outcome::err(state, ShellError::Parse(line.to_string()));
    };

    let Some(command) = registry.get(name) else {
        return Outcome::err(state, ShellError::CommandNotFound(name.clone()));
    };

    debug!(command = %name, args = args.len() - 1, "dispatching");
    let invocation = Invocation::new(&args, registry);
    let fallback = state.clone();

    match panic::catch_unwind(AssertUnwindSafe(|| command.execute(state, &invocation))) {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(command = %name, "command panicked");
            Outcome::err(fallback, ShellError::Panicked(name.clone()))
        }
    }
}
