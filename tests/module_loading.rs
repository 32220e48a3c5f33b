//! Module loading integration tests.
//!
//! Candidates are real files in a temporary plugins directory; binding goes
//! through an in-memory `ModuleBinder` so no compiled libraries are needed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use plugsh::loader::module_file_suffix;
use plugsh::{
    load_all, Captured, Command, CommandRegistry, Commands, Input, Invocation, Isolated,
    LoadError, Module, ModuleBinder, Outcome, Output, SessionState, Shell, ShellError,
    MODULE_SYMBOL,
};

// ============================================================================
// Test fixtures
// ============================================================================

/// Command that records which module it came from.
struct Tagged(&'static str);

impl Command for Tagged {
    fn execute(&self, state: SessionState, _: &Invocation<'_>) -> Outcome {
        Outcome::ok(state.with_var("from", self.0))
    }

    fn summary(&self) -> Option<&str> {
        Some(self.0)
    }
}

/// Module exporting a fixed set of names.
struct Fixed {
    tag: &'static str,
    names: &'static [&'static str],
    init: Init,
    seen: Option<Arc<Mutex<Vec<String>>>>,
}

#[derive(Clone, Copy)]
enum Init {
    Ok,
    Fail,
    Panic,
}

impl Fixed {
    fn new(tag: &'static str, names: &'static [&'static str]) -> Self {
        Self {
            tag,
            names,
            init: Init::Ok,
            seen: None,
        }
    }

    fn init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    fn observe(mut self, seen: Arc<Mutex<Vec<String>>>) -> Self {
        self.seen = Some(seen);
        self
    }
}

impl Module for Fixed {
    fn initialize(&mut self, _: &SessionState, loaded: &CommandRegistry) -> plugsh::Result<()> {
        if let Some(seen) = &self.seen {
            seen.lock().unwrap().extend(loaded.names().map(String::from));
        }
        match self.init {
            Init::Ok => Ok(()),
            Init::Fail => Err(ShellError::command("database unavailable")),
            Init::Panic => panic!("module init exploded"),
        }
    }

    fn commands(&self) -> Commands {
        self.names
            .iter()
            .map(|name| (name.to_string(), Arc::new(Tagged(self.tag)) as Arc<dyn Command>))
            .collect()
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Module>>;

/// Binds files by name to in-memory module factories.
#[derive(Default)]
struct TableBinder {
    modules: HashMap<String, Factory>,
}

impl TableBinder {
    fn with(mut self, stem: &str, factory: impl Fn() -> Box<dyn Module> + 'static) -> Self {
        self.modules.insert(file_name(stem), Box::new(factory));
        self
    }
}

impl ModuleBinder for TableBinder {
    fn bind(&self, path: &Path) -> Result<Box<dyn Module>, LoadError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        match self.modules.get(&name) {
            Some(factory) => Ok(factory()),
            None => Err(LoadError::MissingSymbol(MODULE_SYMBOL)),
        }
    }
}

fn file_name(stem: &str) -> String {
    format!("{}{}", stem, module_file_suffix())
}

/// Plugins directory containing an empty file per stem.
fn plugins_dir(stems: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for stem in stems {
        fs::write(dir.path().join(file_name(stem)), b"").unwrap();
    }
    dir
}

fn state() -> (SessionState, Captured) {
    let (err, captured) = Output::capture();
    (
        SessionState::new(Input::from_text(""), Output::discard(), err),
        captured,
    )
}

fn resolve(registry: &CommandRegistry, name: &str) -> String {
    registry.get(name).unwrap().summary().unwrap().to_string()
}

// ============================================================================
// Merge and isolation
// ============================================================================

#[test]
fn test_later_module_wins_on_collision() {
    let dir = plugins_dir(&["a", "b"]);
    let binder = TableBinder::default()
        .with("a", || Box::new(Fixed::new("first", &["a", "b"])))
        .with("b", || Box::new(Fixed::new("second", &["b", "c"])));
    let (state, err) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    let names: Vec<_> = loaded.registry.names().collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(resolve(&loaded.registry, "a"), "first");
    assert_eq!(resolve(&loaded.registry, "b"), "second");
    assert_eq!(resolve(&loaded.registry, "c"), "second");

    assert_eq!(loaded.report.replaced, vec!["b".to_string()]);
    assert!(err.contents().contains("command b replaces an earlier definition"));
}

#[test]
fn test_failed_init_registers_nothing() {
    let dir = plugins_dir(&["a", "b"]);
    let binder = TableBinder::default()
        .with("a", || Box::new(Fixed::new("broken", &["x", "y"]).init(Init::Fail)))
        .with("b", || Box::new(Fixed::new("good", &["z"])));
    let (state, err) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    assert!(!loaded.registry.contains("x"));
    assert!(!loaded.registry.contains("y"));
    assert_eq!(resolve(&loaded.registry, "z"), "good");

    assert_eq!(loaded.report.skipped.len(), 1);
    let (name, reason) = &loaded.report.skipped[0];
    assert_eq!(name, &file_name("a"));
    assert!(matches!(reason, LoadError::Initialize(msg) if msg == "database unavailable"));
    assert!(err
        .contents()
        .contains("initialization failed: database unavailable"));
}

#[test]
fn test_panicking_init_is_isolated() {
    let dir = plugins_dir(&["a", "b"]);
    let binder = TableBinder::default()
        .with("a", || Box::new(Fixed::new("bad", &["x"]).init(Init::Panic)))
        .with("b", || Box::new(Fixed::new("good", &["y"])));
    let (state, _) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    assert_eq!(loaded.registry.names().collect::<Vec<_>>(), vec!["y"]);
    assert!(matches!(
        loaded.report.skipped[0].1,
        LoadError::Panicked("initialization")
    ));
}

#[test]
fn test_panic_caught_inside_module_is_skipped() {
    let dir = plugins_dir(&["a", "b", "c"]);
    let binder = TableBinder::default()
        .with("a", || {
            Box::new(Isolated::new(|| Fixed::new("bad", &["x"]).init(Init::Panic)))
        })
        .with("b", || Box::new(Isolated::new(|| -> Fixed { panic!("no module today") })))
        .with("c", || Box::new(Isolated::new(|| Fixed::new("good", &["y"]))));
    let (state, err) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    assert_eq!(loaded.registry.names().collect::<Vec<_>>(), vec!["y"]);
    assert!(matches!(
        loaded.report.skipped[0].1,
        LoadError::Panicked("initialization")
    ));
    assert!(matches!(
        loaded.report.skipped[1].1,
        LoadError::Panicked("creation")
    ));
    assert!(err.contents().contains("module panicked during initialization"));
}

#[test]
fn test_missing_symbol_is_skipped() {
    let dir = plugins_dir(&["a", "orphan"]);
    let binder = TableBinder::default().with("a", || Box::new(Fixed::new("a", &["ls"])));
    let (state, err) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    assert_eq!(loaded.registry.len(), 1);
    assert_eq!(loaded.report.loaded.len(), 1);
    assert_eq!(loaded.report.skipped.len(), 1);
    assert!(err
        .contents()
        .contains("does not export symbol \"PLUGSH_MODULE\""));
}

#[test]
fn test_empty_module_is_legal() {
    let dir = plugins_dir(&["noop"]);
    let binder = TableBinder::default().with("noop", || Box::new(Fixed::new("noop", &[])));
    let (state, err) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    assert!(loaded.registry.is_empty());
    assert_eq!(loaded.report.loaded.len(), 1);
    assert!(loaded.report.loaded[0].commands.is_empty());
    assert!(err.contents().is_empty());
}

#[test]
fn test_invalid_names_are_dropped() {
    let dir = plugins_dir(&["a"]);
    let binder =
        TableBinder::default().with("a", || Box::new(Fixed::new("a", &["ok", "", "two words"])));
    let (state, err) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    assert_eq!(loaded.registry.names().collect::<Vec<_>>(), vec!["ok"]);
    assert_eq!(loaded.report.loaded[0].commands, vec!["ok".to_string()]);
    assert!(err.contents().contains("invalid command name"));
}

#[test]
fn test_init_sees_earlier_commands() {
    let dir = plugins_dir(&["a", "b"]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&seen);
    let binder = TableBinder::default()
        .with("a", || Box::new(Fixed::new("a", &["ls", "cd"])))
        .with("b", move || {
            Box::new(Fixed::new("b", &["help"]).observe(Arc::clone(&observed)))
        });
    let (state, _) = state();

    load_all(dir.path(), state, &binder).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["cd".to_string(), "ls".to_string()]);
}

#[test]
fn test_load_order_follows_file_names() {
    let dir = plugins_dir(&["zz", "aa", "mm"]);
    let binder = TableBinder::default()
        .with("zz", || Box::new(Fixed::new("zz", &["x"])))
        .with("aa", || Box::new(Fixed::new("aa", &["x"])))
        .with("mm", || Box::new(Fixed::new("mm", &["x"])));
    let (state, _) = state();

    let loaded = load_all(dir.path(), state, &binder).unwrap();

    let order: Vec<_> = loaded.report.loaded.iter().map(|m| m.name.clone()).collect();
    assert_eq!(order, vec![file_name("aa"), file_name("mm"), file_name("zz")]);
    assert_eq!(resolve(&loaded.registry, "x"), "zz");
}

// ============================================================================
// Shell initialization
// ============================================================================

#[test]
fn test_missing_plugins_dir_fails_init() {
    let dir = TempDir::new().unwrap();
    let mut shell = Shell::new(dir.path().join("plugins"));
    let (state, _) = state();

    let err = shell.init_with(&TableBinder::default(), state).unwrap_err();

    assert!(matches!(err, ShellError::PluginsDir { .. }));
    assert!(shell.registry().is_empty());
}

#[test]
fn test_shell_init_exposes_registry() {
    let dir = plugins_dir(&["core"]);
    let binder = TableBinder::default()
        .with("core", || Box::new(Fixed::new("core", &["help", "exit"])));
    let mut shell = Shell::new(dir.path());
    let (state, _) = state();

    shell.init_with(&binder, state).unwrap();

    assert_eq!(shell.registry().len(), 2);
    assert_eq!(shell.load_report().loaded.len(), 1);
    assert_eq!(
        plugsh::banner::loaded_notice(shell.registry()),
        "Loaded 2 command(s)...\nType help for available commands"
    );

    let quiet = SessionState::new(Input::from_text(""), Output::discard(), Output::discard());
    let outcome = shell.dispatch(quiet, "exit now");
    assert!(outcome.error.is_none());
    assert_eq!(outcome.state.var("from"), Some("core"));
}
