//! Error types for plugsh.

use std::path::PathBuf;

use thiserror::Error;

use crate::phase::LoopPhase;

/// Main error type for shell operations.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The plugins directory is missing or unreadable.
    #[error("plugins directory {}: {source}", .path.display())]
    PluginsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No command is registered under the given name.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The input line could not be split into tokens.
    #[error("unable to parse command line: {0}")]
    Parse(String),

    /// A command reported a failure.
    #[error("{0}")]
    Command(String),

    /// A command panicked while executing.
    #[error("command panicked: {0}")]
    Panicked(String),

    /// Module code panicked at the given stage and the panic was caught
    /// inside the module.
    #[error("module panicked during {0}")]
    ModulePanicked(&'static str),

    /// Invalid session loop transition attempted.
    #[error("invalid phase transition from {from:?} to {to:?}")]
    InvalidPhaseTransition { from: LoopPhase, to: LoopPhase },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ShellError {
    /// Build a command failure from any displayable message.
    pub fn command(message: impl std::fmt::Display) -> Self {
        Self::Command(message.to_string())
    }
}

/// Reasons a single module is skipped during loading.
///
/// None of these abort loading; they are reported and the next candidate
/// is tried.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The library could not be opened.
    #[error("failed to open module: {0}")]
    Open(String),

    /// The library does not export the module declaration.
    #[error("module does not export symbol \"{0}\"")]
    MissingSymbol(&'static str),

    /// The declaration was built against another version of the host.
    #[error("module built for abi {found_abi} / plugsh {found_version}, host is abi {expected_abi} / plugsh {expected_version}")]
    IncompatibleAbi {
        found_abi: u32,
        found_version: String,
        expected_abi: u32,
        expected_version: &'static str,
    },

    /// `Module::initialize` returned an error.
    #[error("initialization failed: {0}")]
    Initialize(String),

    /// The module panicked while being created, initialized or registered.
    #[error("module panicked during {0}")]
    Panicked(&'static str),
}

/// Convenience Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
