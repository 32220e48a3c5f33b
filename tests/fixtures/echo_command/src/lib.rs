//! Command module built as a real shared library for the loader tests.

#![cfg_attr(feature = "no-export", allow(dead_code))]

use std::io::{self, Write};
use std::sync::Arc;

use plugsh::{
    CommandRef, CommandRegistry, Commands, Invocation, Module, Outcome, Output, SessionState,
};

/// Writer whose code lives in this library.
struct Shout(Output);

impl Write for Shout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_all(&buf.to_ascii_uppercase())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

fn echo(state: SessionState, inv: &Invocation<'_>) -> Outcome {
    match state.stdout().write_line(&inv.params().join(" ")) {
        Ok(()) => Outcome::ok(state),
        Err(e) => Outcome::err(state, e.into()),
    }
}

fn shout(state: SessionState, _: &Invocation<'_>) -> Outcome {
    let loud = Output::new(Shout(state.stdout().clone()));
    Outcome::ok(state.with_stdout(loud))
}

fn boom(_: SessionState, _: &Invocation<'_>) -> Outcome {
    panic!("boom");
}

struct Echo;

impl Module for Echo {
    fn initialize(&mut self, _: &SessionState, _: &CommandRegistry) -> plugsh::Result<()> {
        if cfg!(feature = "panic-init") {
            panic!("echo module refuses to start");
        }
        Ok(())
    }

    fn commands(&self) -> Commands {
        let mut commands = Commands::new();
        commands.insert("echo".to_string(), Arc::new(echo) as CommandRef);
        commands.insert("shout".to_string(), Arc::new(shout) as CommandRef);
        commands.insert("boom".to_string(), Arc::new(boom) as CommandRef);
        commands
    }
}

#[cfg(not(any(feature = "no-export", feature = "abi-mismatch")))]
plugsh::export_module!(Echo);

#[cfg(feature = "abi-mismatch")]
#[no_mangle]
pub static PLUGSH_MODULE: plugsh::ModuleDeclaration = plugsh::ModuleDeclaration {
    abi_version: plugsh::ABI_VERSION + 1,
    core_version: plugsh::CORE_VERSION,
    create: || -> Box<dyn Module> { Box::new(Echo) },
};
