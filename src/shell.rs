//! SSH-command transport adapter.
//!
//! Runs once per SSH session, invoked from `authorized_keys` with the
//! pre-authenticated username as its only argument and the client's request
//! in `SSH_ORIGINAL_COMMAND`.  Interactive shells are never granted; the
//! only thing this process will do is authorize one git command and hand it
//! to `git-shell`.
//!
//! Everything printed to the actor is generic.  Unknown and forbidden
//! repositories read identically over SSH so that access probing reveals
//! nothing the verdict itself does not.

use tracing::{info, warn};

use crate::authority::{Actor, AuthorityClient, AuthorityError};
use crate::bridge::{shell as bridge, ExecutionEnvironment, Transport};
use crate::config::ShellConfig;
use crate::grammar::{format_shell_command, parse_shell_command};
use crate::store::RepositoryStore;

// ---------------------------------------------------------------------------
// Session outcome
// ---------------------------------------------------------------------------

/// Exit status for an interactive-shell attempt, distinct from ordinary
/// command failures so operators can tell the two apart in sshd accounting.
pub const EXIT_INTERACTIVE_DENIED: u8 = 2;
pub const EXIT_FAILURE: u8 = 1;

/// A terminated session: one generic line for the actor, an exit status
/// for sshd.  The reason has already been logged.
#[derive(Debug)]
pub struct SessionDenied {
    pub user_message: String,
    pub exit_code: u8,
}

impl SessionDenied {
    fn new(user_message: impl Into<String>, exit_code: u8) -> Self {
        Self {
            user_message: user_message.into(),
            exit_code,
        }
    }
}

// ---------------------------------------------------------------------------
// Session flow
// ---------------------------------------------------------------------------

/// Drive one SSH session from raw command to git-shell exit.
///
/// The caller prints `SessionDenied::user_message` to the actor and exits
/// with the carried status; on `Ok` the subprocess has already streamed its
/// protocol over the inherited stdio and exited cleanly.
pub async fn run(username: &str, config: &ShellConfig) -> Result<(), SessionDenied> {
    info!("client connected");

    // 1. No command means an interactive login attempt.  Refuse kindly.
    let Some(raw_command) = config.original_command.as_deref() else {
        warn!("SSH_ORIGINAL_COMMAND missing, aborting");
        return Err(SessionDenied::new(
            format!("Hey {username}! Sorry, this server doesn't provide shell access. Bye!"),
            EXIT_INTERACTIVE_DENIED,
        ));
    };

    // 2. Parse against the command grammar.
    let Some(command) = parse_shell_command(raw_command) else {
        warn!(command = %raw_command, "invalid git-shell command, aborting");
        return Err(SessionDenied::new(
            "Invalid git-shell command",
            EXIT_FAILURE,
        ));
    };

    // 3. Authorize against the remote authority and obtain the canonical
    //    path.  Unknown and forbidden are reported uniformly.
    let authority = AuthorityClient::new(&config.authority_url);
    let repo_config = match authority.repo_config(&command.repo, username).await {
        Ok(repo_config) => repo_config,
        Err(e @ (AuthorityError::Forbidden | AuthorityError::NotFound)) => {
            warn!(repo = %command.repo, error = %e, "aborting");
            return Err(SessionDenied::new(
                "Access denied or invalid repository path",
                EXIT_FAILURE,
            ));
        }
        Err(e) => {
            warn!(repo = %command.repo, error = %e, "authority failure, aborting");
            return Err(SessionDenied::new(
                "Fatal error, please contact support",
                EXIT_FAILURE,
            ));
        }
    };

    // 4. Resolve the physical path and require a provisioned repository.
    let store = RepositoryStore::new(&config.repos_root);
    let full_repo_path = match store.full_repo_path(&repo_config.real_path) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "repository path resolution failed, aborting");
            return Err(SessionDenied::new(
                "Fatal error, please contact support",
                EXIT_FAILURE,
            ));
        }
    };
    if let Err(e) = store.ensure_pre_receive_hook(&full_repo_path) {
        warn!(repo = %full_repo_path.display(), error = %e, "aborting");
        return Err(SessionDenied::new(
            "Access denied or invalid repository path",
            EXIT_FAILURE,
        ));
    }

    // 5. Hand off to git-shell with a re-quoted physical path.
    let actor = Actor {
        username: username.to_string(),
    };
    let env = build_shell_env(&actor, &command.repo, &repo_config);
    let shell_command = format_shell_command(
        command.service,
        &full_repo_path.display().to_string(),
    );

    info!(command = %shell_command, "invoking git-shell");

    if let Err(e) = bridge::exec_git_shell(&env, &shell_command).await {
        warn!(error = %e, "error occurred in git-shell");
        return Err(SessionDenied::new(
            "Fatal error, please contact support",
            EXIT_FAILURE,
        ));
    }

    info!("client disconnected, all ok");
    Ok(())
}

/// Environment for the git-shell hand-off.  `GIT_PROTOCOL` is forwarded
/// from the value sshd accepted from the client, so upload-pack can speak
/// protocol v2 when the client asked for it.
fn build_shell_env(
    actor: &Actor,
    repo_path: &str,
    repo_config: &crate::authority::RepoConfig,
) -> ExecutionEnvironment {
    let mut env = ExecutionEnvironment::new(Transport::Ssh, actor, repo_path, repo_config);
    if let Ok(protocol) = std::env::var("GIT_PROTOCOL") {
        env.set("GIT_PROTOCOL", protocol);
    }
    env
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
