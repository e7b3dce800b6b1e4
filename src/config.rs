//! Configuration for the SSH gateway binary.
//!
//! `gitgate-shell` is invoked by sshd via `authorized_keys`, so apart from
//! the username argument everything arrives through the environment that
//! sshd sets up for the session.

// ---------------------------------------------------------------------------
// Shell config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Client identity used to tag every log line (`SSH_CLIENT`).
    pub client_id: String,
    /// Operator log file (`LOGFILE`).
    pub logfile: String,
    /// Root directory containing the managed repositories (`REPOSITORIES`).
    pub repos_root: String,
    /// Base URL of the internal authority API (`AUTHORITY_URL`).
    pub authority_url: String,
    /// Raw command requested by the SSH client (`SSH_ORIGINAL_COMMAND`),
    /// absent for interactive-shell attempts.
    pub original_command: Option<String>,
}

fn getenv(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

impl ShellConfig {
    /// Read the session configuration from the process environment.
    pub fn from_env() -> Self {
        let original_command = std::env::var("SSH_ORIGINAL_COMMAND")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            client_id: getenv("SSH_CLIENT", "local"),
            logfile: getenv("LOGFILE", "/tmp/gitgate-shell.log"),
            repos_root: getenv("REPOSITORIES", "/var/www/repositories"),
            authority_url: getenv("AUTHORITY_URL", "http://localhost:3000/api/internal"),
            original_command,
        }
    }
}
