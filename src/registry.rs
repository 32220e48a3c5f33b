//! The command registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::command::Command;

/// Shared handle to a command implementation.
pub type CommandRef = Arc<dyn Command>;

/// Commands exported by one module, keyed by name.
pub type Commands = BTreeMap<String, CommandRef>;

/// Whether `name` can ever be dispatched: non-empty, no whitespace.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

/// Mapping from command name to implementation.
///
/// Built once by the loader at startup and read on every dispatch.
/// Names iterate in sorted order.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandRef>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a command by name.
    pub fn get(&self, name: &str) -> Option<&CommandRef> {
        self.commands.get(name)
    }

    /// Check if a command is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Register a command, returning the entry it replaced.
    pub fn insert(&mut self, name: impl Into<String>, command: CommandRef) -> Option<CommandRef> {
        self.commands.insert(name.into(), command)
    }

    /// Merge a module's commands. Later entries replace same-named ones.
    ///
    /// Returns the names that were replaced.
    pub fn merge(&mut self, commands: Commands) -> Vec<String> {
        let mut replaced = Vec::new();
        for (name, command) in commands {
            if self.commands.insert(name.clone(), command).is_some() {
                replaced.push(name);
            }
        }
        replaced
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Iterate over `(name, command)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandRef)> {
        self.commands.iter().map(|(name, cmd)| (name.as_str(), cmd))
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.commands.keys()).finish()
    }
}
