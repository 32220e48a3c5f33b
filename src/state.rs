//! The session state threaded through every command.

use std::collections::BTreeMap;

use crate::sink::{Input, Output};

/// Prompt shown when nothing else has been configured.
pub const DEFAULT_PROMPT: &str = "plugsh>";

/// Session data handed to each command and returned by it.
///
/// A `SessionState` is never changed in place: every modifier consumes the
/// value and returns a new one. Whatever a command returns replaces the
/// previous state wholesale for the next line, including the prompt the
/// reader prints.
///
/// Cloning is cheap; the stream handles are shared, not duplicated.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Prompt text printed before each read.
    prompt: String,
    /// Where command output goes.
    stdout: Output,
    /// Where diagnostics and command errors go.
    stderr: Output,
    /// Where lines are read from.
    stdin: Input,
    /// Session variables set by commands.
    vars: BTreeMap<String, String>,
}

impl SessionState {
    /// Create a state over the given streams with the default prompt.
    pub fn new(stdin: Input, stdout: Output, stderr: Output) -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            stdout,
            stderr,
            stdin,
            vars: BTreeMap::new(),
        }
    }

    /// Create a state over the process's standard streams.
    pub fn stdio() -> Self {
        Self::new(Input::stdin(), Output::stdout(), Output::stderr())
    }

    /// Current prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn stdout(&self) -> &Output {
        &self.stdout
    }

    pub fn stderr(&self) -> &Output {
        &self.stderr
    }

    pub fn stdin(&self) -> &Input {
        &self.stdin
    }

    /// Get a session variable.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// All session variables, sorted by name.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Replace the prompt.
    pub fn with_prompt(self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..self
        }
    }

    /// Replace the output stream.
    pub fn with_stdout(self, stdout: Output) -> Self {
        Self { stdout, ..self }
    }

    /// Replace the error stream.
    pub fn with_stderr(self, stderr: Output) -> Self {
        Self { stderr, ..self }
    }

    /// Replace the input stream.
    pub fn with_stdin(self, stdin: Input) -> Self {
        Self { stdin, ..self }
    }

    /// Set a session variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Remove a session variable.
    pub fn without_var(mut self, key: &str) -> Self {
        self.vars.remove(key);
        self
    }
}
