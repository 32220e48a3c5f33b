//! Module discovery, binding and registration.
//!
//! Loading never fails because of a single module. Each candidate that
//! cannot be opened, does not export [`MODULE_SYMBOL`], was built for
//! another host, fails to initialize, or panics is reported on the error
//! stream and skipped. Only a missing or unreadable plugins directory is
//! fatal.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{debug, info, warn};

use crate::error::{LoadError, Result, ShellError};
use crate::module::{Module, ModuleDeclaration, ABI_VERSION, CORE_VERSION, MODULE_SYMBOL};
use crate::registry::{is_valid_name, CommandRegistry, Commands};
use crate::state::SessionState;

/// File name suffix, before the library extension, marking a command module.
pub const MODULE_SUFFIX: &str = "_command";

const SYMBOL_BYTES: &[u8] = b"PLUGSH_MODULE\0";

/// Full file name suffix for this platform, e.g. `_command.so`.
pub fn module_file_suffix() -> String {
    format!("{}{}", MODULE_SUFFIX, std::env::consts::DLL_SUFFIX)
}

/// List module candidates in `dir`, sorted by file name.
///
/// Only regular files (or links to them) whose name ends with
/// [`module_file_suffix`] are returned.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| ShellError::PluginsDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let suffix = module_file_suffix();
    let mut candidates = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "failed to read plugins directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&suffix));
        if matches {
            candidates.push(path);
        } else {
            debug!(path = %path.display(), "ignoring non-module file");
        }
    }

    candidates.sort();
    Ok(candidates)
}

/// Binds a candidate file to a [`Module`].
pub trait ModuleBinder {
    /// Open `path` and produce its module.
    fn bind(&self, path: &Path) -> std::result::Result<Box<dyn Module>, LoadError>;
}

/// Binds modules by loading them as dynamic libraries.
///
/// A library that produced a module is never unloaded. Commands, streams
/// and errors built by module code can outlive the shell (the final
/// session state, the detached reader thread), and their code and vtables
/// live in the library.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibBinder;

impl ModuleBinder for DylibBinder {
    fn bind(&self, path: &Path) -> std::result::Result<Box<dyn Module>, LoadError> {
        // SAFETY: modules are trusted; opening one runs its static initializers.
        let library =
            unsafe { Library::new(path) }.map_err(|e| LoadError::Open(e.to_string()))?;

        let declaration: ModuleDeclaration = {
            // SAFETY: `export_module!` declares this symbol as a `ModuleDeclaration` static.
            let symbol: Symbol<'_, *const ModuleDeclaration> = unsafe { library.get(SYMBOL_BYTES) }
                .map_err(|_| LoadError::MissingSymbol(MODULE_SYMBOL))?;
            let ptr = *symbol;
            if ptr.is_null() {
                return Err(LoadError::MissingSymbol(MODULE_SYMBOL));
            }
            // SAFETY: non-null, `repr(C)` with the version fields first, and
            // `create` is only called once both versions match.
            unsafe { *ptr }
        };

        if !declaration.is_compatible() {
            return Err(LoadError::IncompatibleAbi {
                found_abi: declaration.abi_version,
                found_version: declaration.core_version.to_string(),
                expected_abi: ABI_VERSION,
                expected_version: CORE_VERSION,
            });
        }

        let module = (declaration.create)();
        std::mem::forget(library);
        Ok(module)
    }
}

/// A module that was registered.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// File name of the module.
    pub name: String,
    /// Commands it contributed, sorted.
    pub commands: Vec<String>,
}

/// What happened to each candidate.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Modules whose commands were merged, in load order.
    pub loaded: Vec<LoadedModule>,
    /// Modules that were skipped, with the reason.
    pub skipped: Vec<(String, LoadError)>,
    /// Command names that replaced an earlier module's entry.
    pub replaced: Vec<String>,
}

/// Result of [`load_all`].
#[derive(Debug)]
pub struct LoadedModules {
    /// Merged registry of every successfully loaded module.
    pub registry: CommandRegistry,
    /// The session state, handed back for the session loop.
    pub state: SessionState,
    /// Per-module outcome.
    pub report: LoadReport,
}

/// Discover, bind, initialize and merge every module in `dir`.
///
/// Modules load in file name order. When two modules export the same
/// command name, the later one wins and the replacement is reported.
pub fn load_all<B>(dir: &Path, state: SessionState, binder: &B) -> Result<LoadedModules>
where
    B: ModuleBinder + ?Sized,
{
    let candidates = discover(dir)?;
    debug!(dir = %dir.display(), candidates = candidates.len(), "discovered modules");

    let mut registry = CommandRegistry::new();
    let mut report = LoadReport::default();

    for path in candidates {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let commands = match load_one(&path, &state, &registry, binder) {
            Ok(loaded) => loaded,
            Err(e) => {
                diagnose(&state, &format!("skipping module {}: {}", name, e));
                warn!(module = %name, error = %e, "module skipped");
                report.skipped.push((name, e));
                continue;
            }
        };

        let commands = retain_valid(&state, &name, commands);
        let names: Vec<String> = commands.keys().cloned().collect();

        for replaced in registry.merge(commands) {
            diagnose(
                &state,
                &format!("{}: command {} replaces an earlier definition", name, replaced),
            );
            warn!(module = %name, command = %replaced, "command redefined");
            report.replaced.push(replaced);
        }

        info!(module = %name, commands = names.len(), "module loaded");
        report.loaded.push(LoadedModule {
            name,
            commands: names,
        });
    }

    Ok(LoadedModules {
        registry,
        state,
        report,
    })
}

/// Bind and initialize one module, returning its commands.
///
/// Panics are caught here for modules linked into the host. Library
/// modules catch their own through [`Isolated`](crate::module::Isolated)
/// and report them as [`ShellError::ModulePanicked`].
fn load_one<B>(
    path: &Path,
    state: &SessionState,
    loaded: &CommandRegistry,
    binder: &B,
) -> std::result::Result<Commands, LoadError>
where
    B: ModuleBinder + ?Sized,
{
    let mut module = binder.bind(path)?;

    let initialized = panic::catch_unwind(AssertUnwindSafe(|| module.initialize(state, loaded)));
    match initialized {
        Err(_) => return Err(LoadError::Panicked("initialization")),
        Ok(Err(ShellError::ModulePanicked(stage))) => return Err(LoadError::Panicked(stage)),
        Ok(Err(e)) => return Err(LoadError::Initialize(e.to_string())),
        Ok(Ok(())) => {}
    }

    panic::catch_unwind(AssertUnwindSafe(|| module.commands()))
        .map_err(|_| LoadError::Panicked("registration"))
}

/// Drop entries whose name could never be dispatched.
fn retain_valid(state: &SessionState, module: &str, mut commands: Commands) -> Commands {
    commands.retain(|name, _| {
        let valid = is_valid_name(name);
        if !valid {
            diagnose(
                state,
                &format!("{}: ignoring invalid command name {:?}", module, name),
            );
            warn!(module = %module, command = ?name, "invalid command name");
        }
        valid
    });
    commands
}

/// Print a loader diagnostic on the session's error stream.
fn diagnose(state: &SessionState, message: &str) {
    if let Err(e) = state.stderr().write_line(message) {
        warn!(error = %e, "failed to write loader diagnostic");
    }
}
