//! Startup banner and loaded-commands notice.

use std::io;

use crate::registry::CommandRegistry;
use crate::sink::Output;

const BANNER: &str = r#"
        _                 _
  _ __ | |_   _  __ _ ___| |__
 | '_ \| | | | |/ _` / __| '_ \
 | |_) | | |_| | (_| \__ \ | | |
 | .__/|_|\__,_|\__, |___/_| |_|
 |_|            |___/
"#;

/// Print the startup banner.
pub fn print_banner(out: &Output) -> io::Result<()> {
    out.write_line(BANNER)
}

/// Text announcing how many commands were loaded.
pub fn loaded_notice(registry: &CommandRegistry) -> String {
    if registry.is_empty() {
        return "No commands found".to_string();
    }

    let mut notice = format!("Loaded {} command(s)...", registry.len());
    if registry.contains("help") {
        notice.push_str("\nType help for available commands");
    }
    notice
}
