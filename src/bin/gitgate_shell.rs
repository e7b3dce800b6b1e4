//! SSH gateway entry point.
//!
//! Wired into `authorized_keys` as a forced command:
//!
//! ```text
//! command="gitgate-shell alice",no-port-forwarding,no-X11-forwarding ssh-ed25519 AAAA…
//! ```
//!
//! sshd provides the session environment (`SSH_ORIGINAL_COMMAND`,
//! `SSH_CLIENT`); everything the actor sees on failure is one generic line,
//! with the detail in the operator log.

use std::process::ExitCode;

use clap::Parser;
use tracing::Instrument;

use gitgate::config::ShellConfig;
use gitgate::logging::session_span;
use gitgate::shell;

#[derive(Parser, Debug)]
#[command(name = "gitgate-shell", about = "Authenticating SSH gateway for git repositories")]
struct Cli {
    /// Username established by the SSH key match in authorized_keys.
    username: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ShellConfig::from_env();

    if let Err(e) = gitgate::logging::init_shell(&config.logfile) {
        // No log file means no traceability; refuse the session.
        eprintln!("Error occurred, please contact support");
        eprintln!("{e:#}");
        return ExitCode::from(shell::EXIT_FAILURE);
    }

    // Pushes create files through git-shell; fix the mask before any
    // spawn can happen.
    gitgate::set_push_umask();

    let span = session_span(&config.client_id);
    match shell::run(&cli.username, &config).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(denied) => {
            println!("{}", denied.user_message);
            ExitCode::from(denied.exit_code)
        }
    }
}
