//! plugsh binary entry point.

use std::process::ExitCode;

use plugsh::config::Config;
use plugsh::{banner, logging, SessionState, Shell, ShellError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load().map_err(ShellError::from) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to initialize: {}", e);
            return ExitCode::from(1);
        }
    };

    logging::init(config.log_filter());
    info!("plugsh v{}", env!("CARGO_PKG_VERSION"));

    let state = SessionState::stdio().with_prompt(config.shell.prompt.clone());
    if config.shell.banner {
        if let Err(e) = banner::print_banner(state.stdout()) {
            warn!(error = %e, "failed to print banner");
        }
    }

    let mut shell = Shell::new(config.shell.plugins_dir.clone());
    let state = match shell.init(state) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("\n\nfailed to initialize: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = state
        .stdout()
        .write_line(&format!("\n{}\n", banner::loaded_notice(shell.registry())))
    {
        warn!(error = %e, "failed to print loaded commands");
    }

    let cancel = CancellationToken::new();
    let closed = shell.closed();
    let mut session = tokio::spawn({
        let cancel = cancel.clone();
        async move { shell.open(state, cancel).await }
    });

    let result = tokio::select! {
        result = &mut session => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "failed to listen for interrupt");
            }
            info!("received interrupt");
            cancel.cancel();
            closed.wait().await;
            session.await
        }
    };

    match result {
        Ok(Ok(_)) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!(error = %e, "session loop failed");
            ExitCode::from(1)
        }
        Err(e) => {
            error!(error = %e, "session task failed");
            ExitCode::from(1)
        }
    }
}
