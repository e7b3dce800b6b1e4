//! Process bridge: construction of the subprocess environment and the two
//! hand-off paths (CGI for HTTP, git-shell for SSH).
//!
//! The bridged subprocess never inherits the gateway's own environment.
//! Every variable it sees is listed explicitly here, built fresh per
//! request and discarded with it.

pub mod cgi;
pub mod shell;

use crate::authority::{Actor, RepoConfig};

// ---------------------------------------------------------------------------
// Execution environment
// ---------------------------------------------------------------------------

/// Transport the request arrived on, exported to the subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Ssh,
}

impl Transport {
    fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Ssh => "ssh",
        }
    }
}

/// `PATH` handed to subprocesses.  The bridges clear the ambient
/// environment, so the interpreter must be told where to find git.
pub const SUBPROCESS_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// The explicit, minimal environment handed to one subprocess invocation.
#[derive(Debug, Clone)]
pub struct ExecutionEnvironment {
    vars: Vec<(String, String)>,
}

impl ExecutionEnvironment {
    /// Base environment shared by both transports: transport kind, actor
    /// identity, and the logical plus canonical repository paths.
    pub fn new(
        transport: Transport,
        actor: &Actor,
        repo_path: &str,
        repo_config: &RepoConfig,
    ) -> Self {
        let mut env = Self { vars: Vec::new() };
        env.set("PATH", SUBPROCESS_PATH);
        env.set("GITGATE_PROTO", transport.as_str());
        env.set("GITGATE_USERNAME", &actor.username);
        env.set("GITGATE_REPOSITORY_PATH", repo_path);
        env.set("GITGATE_REAL_REPOSITORY_PATH", &repo_config.real_path);
        env
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
