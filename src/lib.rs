//! # plugsh
//!
//! An extensible interactive command shell whose commands live in
//! dynamically loaded modules.
//!
//! At startup the shell scans a plugins directory for libraries named
//! `*_command.<dll extension>`, binds each one to the [`Module`]
//! capability, initializes it and merges its commands into one
//! [`CommandRegistry`]. A broken module is reported and skipped; it never
//! stops the shell.
//!
//! The session loop then reads one line at a time, dispatches it and adopts
//! the [`SessionState`] the command returns, so a command can change the
//! prompt, the streams or session variables for every later line.
//!
//! ## Features
//!
//! - **Isolated loading**: open, symbol, version, init and panic failures
//!   skip one module only; panics in module code are caught inside the
//!   module, and module libraries stay loaded for the life of the process
//! - **Explicit state**: commands take a state by value and return the next one
//! - **Cancellable input**: cancellation never waits on a blocked read
//!
//! ## Quick Start
//!
//! ```no_run
//! use plugsh::{Shell, SessionState};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> plugsh::Result<()> {
//!     plugsh::logging::try_init("info").ok();
//!
//!     let mut shell = Shell::new("./plugins");
//!     let state = shell.init(SessionState::stdio())?;
//!     println!("{}", plugsh::banner::loaded_notice(shell.registry()));
//!
//!     shell.open(state, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod banner;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod loader;
pub mod logging;
pub mod module;
pub mod phase;
pub mod registry;
pub mod shell;
pub mod sink;
pub mod state;

// Re-export commonly used types
pub use command::{Command, Invocation, Outcome};
pub use error::{LoadError, Result, ShellError};
pub use loader::{load_all, DylibBinder, LoadReport, LoadedModules, ModuleBinder};
pub use module::{Isolated, Module, ModuleDeclaration, ABI_VERSION, CORE_VERSION, MODULE_SYMBOL};
pub use phase::LoopPhase;
pub use registry::{CommandRef, CommandRegistry, Commands};
pub use shell::{Closed, Shell};
pub use sink::{Captured, Input, Output};
pub use state::{SessionState, DEFAULT_PROMPT};
