//! The module descriptor capability and its export contract.
//!
//! A command module is a dynamic library (a `cdylib` depending on this
//! crate) whose file name ends in `_command` plus the platform library
//! extension. It exports one static, [`MODULE_SYMBOL`], created with
//! [`export_module!`]:
//!
//! ```ignore
//! use plugsh::{export_module, Commands, CommandRegistry, Module, SessionState};
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Module for Greeter {
//!     fn initialize(&mut self, _: &SessionState, _: &CommandRegistry) -> plugsh::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn commands(&self) -> Commands {
//!         Commands::new()
//!     }
//! }
//!
//! export_module!(Greeter::default());
//! ```
//!
//! Modules are trusted: nothing is sandboxed. The declaration only guards
//! against libraries built for another host version.
//!
//! A `cdylib` carries its own copy of std, so a panic unwinding out of
//! module code cannot be caught by the host and aborts the process.
//! [`export_module!`] therefore wraps every module in [`Isolated`], which
//! catches panics on the module's side of the boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::command::{Command, Invocation, Outcome};
use crate::error::{Result, ShellError};
use crate::registry::{CommandRef, CommandRegistry, Commands};
use crate::state::SessionState;

/// Name of the static every module exports.
pub const MODULE_SYMBOL: &str = "PLUGSH_MODULE";

/// Bumped whenever the [`Module`] or [`Command`](crate::Command) traits
/// change shape.
pub const ABI_VERSION: u32 = 1;

/// Version of the host crate a module was compiled against.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A loadable unit that contributes commands.
///
/// Used only while loading; the shell keeps the commands, not the module.
pub trait Module: Send {
    /// Prepare the module.
    ///
    /// `loaded` holds every command registered by modules loaded earlier.
    /// Returning an error keeps all of this module's commands out of the
    /// registry.
    fn initialize(&mut self, state: &SessionState, loaded: &CommandRegistry) -> Result<()>;

    /// The commands this module provides. May be empty.
    fn commands(&self) -> Commands;
}

/// The value exported under [`MODULE_SYMBOL`].
///
/// The version fields lead the layout and must stay first in every ABI
/// revision.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModuleDeclaration {
    /// [`ABI_VERSION`] at the time the module was built.
    pub abi_version: u32,
    /// [`CORE_VERSION`] at the time the module was built.
    pub core_version: &'static str,
    /// Creates a fresh module instance.
    pub create: fn() -> Box<dyn Module>,
}

impl ModuleDeclaration {
    /// Whether this declaration matches the running host.
    pub fn is_compatible(&self) -> bool {
        self.abi_version == ABI_VERSION && self.core_version == CORE_VERSION
    }
}

/// A module whose panics never leave the code that raised them.
///
/// Creation, initialization and registration each run under
/// `catch_unwind`; a panic in any of them surfaces as
/// [`ShellError::ModulePanicked`] from [`initialize`](Module::initialize).
/// Every registered command is wrapped the same way, so a panicking
/// command returns [`ShellError::Panicked`] with the state it was given.
pub struct Isolated<M> {
    inner: Option<M>,
    commands: Commands,
}

impl<M: Module> Isolated<M> {
    /// Build the wrapped module, remembering whether `constructor` panicked.
    pub fn new(constructor: impl FnOnce() -> M) -> Self {
        Self {
            inner: panic::catch_unwind(AssertUnwindSafe(constructor)).ok(),
            commands: Commands::new(),
        }
    }
}

impl<M: Module> Module for Isolated<M> {
    fn initialize(&mut self, state: &SessionState, loaded: &CommandRegistry) -> Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or(ShellError::ModulePanicked("creation"))?;

        panic::catch_unwind(AssertUnwindSafe(|| inner.initialize(state, loaded)))
            .map_err(|_| ShellError::ModulePanicked("initialization"))??;

        let commands = panic::catch_unwind(AssertUnwindSafe(|| inner.commands()))
            .map_err(|_| ShellError::ModulePanicked("registration"))?;

        self.commands = commands
            .into_iter()
            .map(|(name, command)| {
                let guarded: CommandRef = Arc::new(IsolatedCommand {
                    name: name.clone(),
                    command,
                });
                (name, guarded)
            })
            .collect();
        Ok(())
    }

    fn commands(&self) -> Commands {
        self.commands.clone()
    }
}

struct IsolatedCommand {
    name: String,
    command: CommandRef,
}

impl Command for IsolatedCommand {
    fn execute(&self, state: SessionState, invocation: &Invocation<'_>) -> Outcome {
        let fallback = state.clone();
        panic::catch_unwind(AssertUnwindSafe(|| self.command.execute(state, invocation)))
            .unwrap_or_else(|_| Outcome::err(fallback, ShellError::Panicked(self.name.clone())))
    }

    fn summary(&self) -> Option<&str> {
        self.command.summary()
    }
}

/// Export a module from a `cdylib`.
///
/// The argument is an expression evaluated once per load to build the
/// module value. The module is wrapped in [`Isolated`].
#[macro_export]
macro_rules! export_module {
    ($constructor:expr) => {
        #[no_mangle]
        pub static PLUGSH_MODULE: $crate::ModuleDeclaration = $crate::ModuleDeclaration {
            abi_version: $crate::ABI_VERSION,
            core_version: $crate::CORE_VERSION,
            create: || -> ::std::boxed::Box<dyn $crate::Module> {
                ::std::boxed::Box::new($crate::module::Isolated::new(|| $constructor))
            },
        };
    };
}
